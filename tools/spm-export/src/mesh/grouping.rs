//! Material grouping
//!
//! Triangles are stable-sorted by their concatenated texture names so each
//! texture pair forms one contiguous run. Every run becomes one material slot.

use std::ops::Range;

use spm_common::MaterialEntry;
use spm_common::formats::{MAX_NAME_LEN, truncate_name};

use super::types::{TextureKey, Triangle};
use crate::error::{EncodeError, EncodeWarning};

/// A contiguous range of sorted triangles sharing one texture pair
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialRun {
    pub textures: TextureKey,
    pub range: Range<usize>,
}

/// Stable sort by concatenated texture names.
///
/// Ties on the concatenation are broken by the pair itself so distinct
/// pairs that concatenate identically still form separate contiguous runs.
pub fn sort_by_material(triangles: &mut [Triangle]) {
    triangles.sort_by_cached_key(|t| (t.textures.sort_key(), t.textures.clone()));
}

/// Split sorted triangles into runs of equal texture pairs
pub fn material_runs(triangles: &[Triangle]) -> Result<Vec<MaterialRun>, EncodeError> {
    let mut runs: Vec<MaterialRun> = Vec::new();
    for (i, triangle) in triangles.iter().enumerate() {
        match runs.last_mut() {
            Some(run) if run.textures == triangle.textures => run.range.end = i + 1,
            _ => runs.push(MaterialRun {
                textures: triangle.textures.clone(),
                range: i..i + 1,
            }),
        }
    }

    if runs.len() > u16::MAX as usize {
        return Err(EncodeError::TooMany {
            what: "materials",
            count: runs.len(),
            limit: u16::MAX as usize,
        });
    }
    Ok(runs)
}

/// Material table for a set of runs.
///
/// A file whose only run is untextured gets an empty table; its buffers use
/// the implicit slot 0.
pub fn material_table(runs: &[MaterialRun], warnings: &mut Vec<EncodeWarning>) -> Vec<MaterialEntry> {
    let table: Vec<MaterialEntry> = runs
        .iter()
        .map(|run| {
            let mut name = |name: &Option<String>| {
                name.as_deref().map(|n| {
                    if n.len() > MAX_NAME_LEN {
                        warnings.push(EncodeWarning::NameTruncated(n.to_string()).raise());
                    }
                    truncate_name(n).to_string()
                })
            };
            let texture_one = name(&run.textures.texture_one);
            let texture_two = name(&run.textures.texture_two);
            MaterialEntry::new(texture_one, texture_two)
        })
        .collect();

    if table.len() == 1 && table[0].is_untextured() {
        return Vec::new();
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::types::Vertex;

    fn triangle(one: Option<&str>, two: Option<&str>, tag: f32) -> Triangle {
        let vertex = Vertex {
            position: [tag, 0.0, 0.0],
            ..Default::default()
        };
        Triangle {
            vertices: [vertex.clone(), vertex.clone(), vertex],
            influences: Default::default(),
            textures: TextureKey {
                texture_one: one.map(String::from),
                texture_two: two.map(String::from),
            },
            armature: None,
        }
    }

    #[test]
    fn test_sort_is_stable_and_grouped() {
        let mut triangles = vec![
            triangle(Some("b.png"), None, 0.0),
            triangle(None, None, 1.0),
            triangle(Some("a.png"), None, 2.0),
            triangle(Some("b.png"), None, 3.0),
            triangle(None, None, 4.0),
        ];
        sort_by_material(&mut triangles);

        let tags: Vec<f32> = triangles.iter().map(|t| t.vertices[0].position[0]).collect();
        assert_eq!(tags, [1.0, 4.0, 2.0, 0.0, 3.0]);

        let runs = material_runs(&triangles).unwrap();
        assert_eq!(runs.len(), 3);
        assert_eq!(runs[0].range, 0..2);
        assert_eq!(runs[2].range, 3..5);
    }

    #[test]
    fn test_identical_concatenation_stays_separate() {
        let mut triangles = vec![
            triangle(Some("ab"), None, 0.0),
            triangle(Some("a"), Some("b"), 1.0),
            triangle(Some("ab"), None, 2.0),
        ];
        sort_by_material(&mut triangles);
        let runs = material_runs(&triangles).unwrap();
        assert_eq!(runs.len(), 2);
    }

    #[test]
    fn test_untextured_only_gives_empty_table() {
        let triangles = vec![triangle(None, None, 0.0)];
        let runs = material_runs(&triangles).unwrap();
        let mut warnings = Vec::new();
        assert!(material_table(&runs, &mut warnings).is_empty());
    }

    #[test]
    fn test_mixed_table_keeps_untextured_slot() {
        let mut triangles = vec![triangle(Some("a.png"), None, 0.0), triangle(None, None, 1.0)];
        sort_by_material(&mut triangles);
        let runs = material_runs(&triangles).unwrap();
        let mut warnings = Vec::new();
        let table = material_table(&runs, &mut warnings);
        assert_eq!(
            table,
            [
                MaterialEntry::default(),
                MaterialEntry::new(Some("a.png".into()), None)
            ]
        );
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_long_names_truncated_with_warning() {
        let long = "x".repeat(300);
        let triangles = vec![triangle(Some(&long), None, 0.0)];
        let runs = material_runs(&triangles).unwrap();
        let mut warnings = Vec::new();
        let table = material_table(&runs, &mut warnings);
        assert_eq!(table[0].texture_one.as_ref().map(String::len), Some(255));
        assert_eq!(warnings, [EncodeWarning::NameTruncated(long)]);
    }
}
