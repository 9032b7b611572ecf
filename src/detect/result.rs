use anyhow::{anyhow, Result};

use crate::geometry::{NormalizedBox, Rect};

/// Index of the first class score in a Darknet-style output row.
///
/// Rows are `[cx, cy, w, h, objectness, score_0, score_1, ...]`. Objectness is
/// not used for selection.
pub const DARKNET_SCORES_OFFSET: usize = 5;

/// One candidate as emitted by the model, before any filtering.
#[derive(Clone, Debug, PartialEq)]
pub struct RawDetection {
    pub bbox: NormalizedBox,
    pub class_scores: Vec<f32>,
}

impl RawDetection {
    /// Class with the highest score. Ties go to the lowest index; NaN scores never win.
    pub fn best_class(&self) -> Option<(usize, f32)> {
        let mut best: Option<(usize, f32)> = None;
        for (idx, &score) in self.class_scores.iter().enumerate() {
            if score.is_nan() {
                continue;
            }
            match best {
                Some((_, current)) if score <= current => {}
                _ => best = Some((idx, score)),
            }
        }
        best
    }
}

/// A candidate that survived filtering, in pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Detection {
    pub rect: Rect,
    pub class_id: usize,
    pub confidence: f32,
}

/// Split a flat `rows x row_len` output buffer into candidates.
pub fn parse_darknet_rows(data: &[f32], row_len: usize) -> Result<Vec<RawDetection>> {
    if row_len <= DARKNET_SCORES_OFFSET {
        return Err(anyhow!(
            "detector rows must have more than {} columns, got {}",
            DARKNET_SCORES_OFFSET,
            row_len
        ));
    }
    if data.len() % row_len != 0 {
        return Err(anyhow!(
            "detector output of {} values is not a multiple of row length {}",
            data.len(),
            row_len
        ));
    }
    Ok(data
        .chunks_exact(row_len)
        .map(|row| RawDetection {
            bbox: NormalizedBox {
                cx: row[0],
                cy: row[1],
                w: row[2],
                h: row[3],
            },
            class_scores: row[DARKNET_SCORES_OFFSET..].to_vec(),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn best_class_prefers_first_maximum() {
        let raw = RawDetection {
            bbox: NormalizedBox {
                cx: 0.5,
                cy: 0.5,
                w: 0.1,
                h: 0.1,
            },
            class_scores: vec![0.1, 0.7, 0.7, 0.2],
        };
        assert_eq!(raw.best_class(), Some((1, 0.7)));
    }

    #[test]
    fn best_class_skips_nan_scores() {
        let raw = RawDetection {
            bbox: NormalizedBox {
                cx: 0.5,
                cy: 0.5,
                w: 0.1,
                h: 0.1,
            },
            class_scores: vec![f32::NAN, 0.3, f32::NAN, 0.2],
        };
        assert_eq!(raw.best_class(), Some((1, 0.3)));

        let only_nan = RawDetection {
            class_scores: vec![f32::NAN; 3],
            ..raw
        };
        assert_eq!(only_nan.best_class(), None);
    }

    #[test]
    fn best_class_of_empty_scores_is_none() {
        let raw = RawDetection {
            bbox: NormalizedBox {
                cx: 0.0,
                cy: 0.0,
                w: 0.0,
                h: 0.0,
            },
            class_scores: vec![],
        };
        assert_eq!(raw.best_class(), None);
    }

    #[test]
    fn parses_rows_and_skips_objectness() -> Result<()> {
        let data = [
            0.5, 0.25, 0.1, 0.2, 0.99, 0.0, 0.8, //
            0.1, 0.1, 0.05, 0.05, 0.10, 0.3, 0.0,
        ];
        let rows = parse_darknet_rows(&data, 7)?;
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].bbox.cy, 0.25);
        assert_eq!(rows[0].class_scores, vec![0.0, 0.8]);
        assert_eq!(rows[1].class_scores, vec![0.3, 0.0]);
        Ok(())
    }

    #[test]
    fn rejects_ragged_output() {
        assert!(parse_darknet_rows(&[0.0; 13], 7).is_err());
        assert!(parse_darknet_rows(&[0.0; 10], 5).is_err());
    }
}
