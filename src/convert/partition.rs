//! Per-material face partition of one frame.

/// Faces of a frame grouped by active material.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Partition {
    /// One ascending face list per active material, in list order.
    pub sets: Vec<Vec<i32>>,
    /// Faces whose material id names no active material.
    pub unassigned: usize,
}

/// Group faces by material id. `material_count` is the length of the
/// frame's active material list; ids at or past it count as unassigned.
pub fn partition_faces(face_materials: &[Option<u32>], material_count: usize) -> Partition {
    let mut partition = Partition {
        sets: vec![Vec::new(); material_count],
        unassigned: 0,
    };
    for (face, material) in face_materials.iter().enumerate() {
        match material.and_then(|m| partition.sets.get_mut(m as usize)) {
            Some(set) => set.push(face as i32),
            None => partition.unassigned += 1,
        }
    }
    partition
}
