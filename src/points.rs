//! Unit-vector direction grids.
//!
//! The grids are generated once and shared by reference: every pipeline that
//! localizes on the half sphere scans the same static point set.

use std::collections::HashMap;

use lazy_static::lazy_static;

use crate::math::Xyz;

/// Which portion of the unit sphere a grid covers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Geometry {
    /// Subdivided icosahedron covering the full sphere, 2562 points.
    Sphere,
    /// The spherical grid restricted to `z >= 0`.
    #[default]
    HalfSphere,
    /// The unit circle in the xy plane in 2 degree steps, 181 points.
    Arc,
}

/// An immutable set of unit direction vectors with a known typical spacing.
#[derive(Clone, Debug)]
pub struct Points {
    geometry: Geometry,
    points: Vec<Xyz>,
    spacing: f32,
}

/// Number of icosahedron subdivisions for the spherical grids.
const SUBDIVISIONS: usize = 4;

lazy_static! {
    static ref SPHERE: Points = Points::new(Geometry::Sphere);
    static ref HALF_SPHERE: Points = Points::new(Geometry::HalfSphere);
    static ref ARC: Points = Points::new(Geometry::Arc);
}

impl Points {
    /// The shared instance of a grid. Grids are read-only and safe to share
    /// across pipelines and threads.
    pub fn shared(geometry: Geometry) -> &'static Points {
        match geometry {
            Geometry::Sphere => &SPHERE,
            Geometry::HalfSphere => &HALF_SPHERE,
            Geometry::Arc => &ARC,
        }
    }

    /// Build an owned grid. Prefer [`Points::shared`].
    pub fn new(geometry: Geometry) -> Self {
        let points = match geometry {
            Geometry::Sphere => icosphere(SUBDIVISIONS),
            Geometry::HalfSphere => icosphere(SUBDIVISIONS)
                .into_iter()
                .filter(|p| p.z >= -1.0e-6)
                .collect(),
            Geometry::Arc => arc(),
        };
        let spacing = nearest_neighbor_angle(&points);
        Self {
            geometry,
            points,
            spacing,
        }
    }

    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    #[inline]
    pub fn get(&self, index: usize) -> Xyz {
        self.points[index]
    }

    pub fn iter(&self) -> core::slice::Iter<'_, Xyz> {
        self.points.iter()
    }

    pub fn as_slice(&self) -> &[Xyz] {
        &self.points
    }

    /// Typical angular distance to the nearest neighboring point, radians.
    pub fn spacing(&self) -> f32 {
        self.spacing
    }
}

/// Angle from the first point to its nearest neighbor. The grids are close
/// to uniform, so one sample is representative.
fn nearest_neighbor_angle(points: &[Xyz]) -> f32 {
    let first = points[0];
    points
        .iter()
        .skip(1)
        .map(|p| first.angle(*p))
        .fold(f32::MAX, f32::min)
}

fn arc() -> Vec<Xyz> {
    (0..=360)
        .step_by(2)
        .map(|degrees| {
            let theta = (degrees as f32).to_radians();
            Xyz::new(theta.cos(), theta.sin(), 0.0)
        })
        .collect()
}

/// Subdivided icosahedron projected onto the unit sphere. Each subdivision
/// splits every face in four, deduplicating edge midpoints, which yields
/// `10 * 4^n + 2` vertices.
fn icosphere(subdivisions: usize) -> Vec<Xyz> {
    let phi = (1.0 + 5.0f32.sqrt()) / 2.0;
    let mut vertices: Vec<Xyz> = [
        (-1.0, phi, 0.0),
        (1.0, phi, 0.0),
        (-1.0, -phi, 0.0),
        (1.0, -phi, 0.0),
        (0.0, -1.0, phi),
        (0.0, 1.0, phi),
        (0.0, -1.0, -phi),
        (0.0, 1.0, -phi),
        (phi, 0.0, -1.0),
        (phi, 0.0, 1.0),
        (-phi, 0.0, -1.0),
        (-phi, 0.0, 1.0),
    ]
    .iter()
    .map(|&(x, y, z)| Xyz::new(x, y, z).unit())
    .collect();

    let mut faces: Vec<[u32; 3]> = vec![
        [0, 11, 5],
        [0, 5, 1],
        [0, 1, 7],
        [0, 7, 10],
        [0, 10, 11],
        [1, 5, 9],
        [5, 11, 4],
        [11, 10, 2],
        [10, 7, 6],
        [7, 1, 8],
        [3, 9, 4],
        [3, 4, 2],
        [3, 2, 6],
        [3, 6, 8],
        [3, 8, 9],
        [4, 9, 5],
        [2, 4, 11],
        [6, 2, 10],
        [8, 6, 7],
        [9, 8, 1],
    ];

    let mut midpoints: HashMap<(u32, u32), u32> = HashMap::new();
    for _ in 0..subdivisions {
        let mut next_faces = Vec::with_capacity(faces.len() * 4);
        for face in &faces {
            let ab = midpoint(face[0], face[1], &mut vertices, &mut midpoints);
            let bc = midpoint(face[1], face[2], &mut vertices, &mut midpoints);
            let ca = midpoint(face[2], face[0], &mut vertices, &mut midpoints);
            next_faces.push([face[0], ab, ca]);
            next_faces.push([face[1], bc, ab]);
            next_faces.push([face[2], ca, bc]);
            next_faces.push([ab, bc, ca]);
        }
        faces = next_faces;
        midpoints.clear();
    }
    vertices
}

fn midpoint(
    a: u32,
    b: u32,
    vertices: &mut Vec<Xyz>,
    cache: &mut HashMap<(u32, u32), u32>,
) -> u32 {
    let key = (a.min(b), a.max(b));
    if let Some(&index) = cache.get(&key) {
        return index;
    }
    let mid = ((vertices[a as usize] + vertices[b as usize]) * 0.5).unit();
    let index = vertices.len() as u32;
    vertices.push(mid);
    cache.insert(key, index);
    index
}
