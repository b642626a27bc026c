//! Chart segmentation and planar parameterization.

use std::collections::{HashMap, VecDeque};

use glam::{Vec2, Vec3};

use super::{ChartOptions, InputMesh};

/// A connected set of faces projected onto one plane.
pub(crate) struct Chart {
    pub mesh: usize,
    /// Faces in ascending order.
    pub faces: Vec<u32>,
    /// Input vertex of each chart-local vertex.
    pub vertices: Vec<u32>,
    /// Three chart-local vertices per face, parallel to `faces`.
    pub local_indices: Vec<u32>,
    /// Chart-local UVs in world units, minimum corner at the origin.
    pub uvs: Vec<Vec2>,
    pub extent: Vec2,
    /// Surface area in world units.
    pub area: f32,
}

pub(crate) fn build_charts(mesh: &InputMesh, mesh_index: usize, options: &ChartOptions) -> Vec<Chart> {
    let face_count = mesh.face_count();
    let welded = weld(&mesh.positions);
    let normals: Vec<Vec3> = (0..face_count).map(|f| face_normal(mesh, f)).collect();

    let edge_key = |face: usize, edge: usize| -> Option<(u32, u32)> {
        let a = welded[mesh.indices[face * 3 + edge] as usize];
        let b = welded[mesh.indices[face * 3 + (edge + 1) % 3] as usize];
        (a != b).then(|| (a.min(b), a.max(b)))
    };

    let mut edge_faces: HashMap<(u32, u32), Vec<u32>> = HashMap::new();
    for face in 0..face_count {
        for edge in 0..3 {
            if let Some(key) = edge_key(face, edge) {
                edge_faces.entry(key).or_default().push(face as u32);
            }
        }
    }

    let min_cos = options.max_normal_deviation.to_radians().cos();
    let mut assigned = vec![false; face_count];
    let mut charts = Vec::new();

    for seed in 0..face_count {
        if assigned[seed] {
            continue;
        }
        assigned[seed] = true;
        let seed_normal = normals[seed];
        let material = mesh.face_material(seed);

        let mut faces = vec![seed as u32];
        let mut queue = VecDeque::from([seed]);
        while let Some(face) = queue.pop_front() {
            for edge in 0..3 {
                let Some(neighbors) = edge_key(face, edge).and_then(|k| edge_faces.get(&k)) else {
                    continue;
                };
                for &next in neighbors {
                    let next = next as usize;
                    if assigned[next]
                        || mesh.face_material(next) != material
                        || normals[next].dot(seed_normal) < min_cos
                    {
                        continue;
                    }
                    assigned[next] = true;
                    faces.push(next as u32);
                    queue.push_back(next);
                }
            }
        }
        faces.sort_unstable();
        charts.push(parameterize(mesh, mesh_index, faces, seed_normal, options.fix_winding));
    }
    charts
}

/// Canonical vertex per position, so that split vertices stay connected.
fn weld(positions: &[Vec3]) -> Vec<u32> {
    let mut first: HashMap<[u32; 3], u32> = HashMap::with_capacity(positions.len());
    positions
        .iter()
        .enumerate()
        .map(|(i, p)| {
            // -0.0 and 0.0 are the same point
            let key = (*p + Vec3::ZERO).to_array().map(f32::to_bits);
            *first.entry(key).or_insert(i as u32)
        })
        .collect()
}

fn face_normal(mesh: &InputMesh, face: usize) -> Vec3 {
    let corner = |c: usize| mesh.indices[face * 3 + c] as usize;
    let (a, b, c) = (corner(0), corner(1), corner(2));
    let p = &mesh.positions;
    let n = (p[b] - p[a]).cross(p[c] - p[a]);
    if let Some(n) = n.try_normalize() {
        return n;
    }
    // Degenerate triangle: fall back to the declared vertex normals.
    if !mesh.normals.is_empty() {
        if let Some(n) = (mesh.normals[a] + mesh.normals[b] + mesh.normals[c]).try_normalize() {
            return n;
        }
    }
    Vec3::Z
}

fn parameterize(mesh: &InputMesh, mesh_index: usize, faces: Vec<u32>, normal: Vec3, fix_winding: bool) -> Chart {
    let (u_axis, v_axis) = normal.any_orthonormal_pair();

    let mut local_of: HashMap<u32, u32> = HashMap::new();
    let mut vertices = Vec::new();
    let mut local_indices = Vec::with_capacity(faces.len() * 3);
    for &face in &faces {
        for corner in 0..3 {
            let input = mesh.indices[face as usize * 3 + corner];
            let local = *local_of.entry(input).or_insert_with(|| {
                vertices.push(input);
                vertices.len() as u32 - 1
            });
            local_indices.push(local);
        }
    }

    let mut uvs: Vec<Vec2> = vertices
        .iter()
        .map(|&v| {
            let p = mesh.positions[v as usize];
            Vec2::new(p.dot(u_axis), p.dot(v_axis))
        })
        .collect();

    let mut area = 0.0;
    let mut signed_uv_area = 0.0;
    for (tri, &face) in local_indices.chunks_exact(3).zip(&faces) {
        let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| uvs[i as usize]);
        signed_uv_area += (b - a).perp_dot(c - a);
        let corner = |k: usize| mesh.positions[mesh.indices[face as usize * 3 + k] as usize];
        area += 0.5 * (corner(1) - corner(0)).cross(corner(2) - corner(0)).length();
    }
    if fix_winding && signed_uv_area < 0.0 {
        for uv in &mut uvs {
            uv.x = -uv.x;
        }
    }

    let min = uvs.iter().copied().fold(Vec2::splat(f32::INFINITY), Vec2::min);
    let max = uvs.iter().copied().fold(Vec2::splat(f32::NEG_INFINITY), Vec2::max);
    for uv in &mut uvs {
        *uv -= min;
    }

    Chart {
        mesh: mesh_index,
        faces,
        vertices,
        local_indices,
        uvs,
        extent: max - min,
        area,
    }
}
