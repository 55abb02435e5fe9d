//! Label table loading and preparation for the SIIM pneumothorax CSV format.
//!
//! The source file is a two-column table of image identifier and RLE label.
//! Its header ships as `ImageId, EncodedPixels` — with a leading space on the
//! second column name, a quirk of the original data file — and the label
//! fields carry the same leading space. Both are normalized by trimming here.

use std::collections::HashSet;
use std::io::{BufRead, BufReader};
use std::path::Path;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rayon::prelude::*;
use thiserror::Error;

use crate::mask::{self, RleError};
use crate::types::ImageRecord;

#[derive(Debug, Error)]
pub enum LabelError {
    #[error("cannot read label file: {0}")]
    Io(#[from] std::io::Error),
    #[error("label file is empty")]
    Empty,
    #[error("unexpected header '{0}'; expected ImageId and EncodedPixels columns")]
    BadHeader(String),
    #[error("row {line} has no label column: '{row}'")]
    ShortRow { line: usize, row: String },
    #[error("record '{image_id}': {source}")]
    BadRle { image_id: String, source: RleError },
    #[error("record '{image_id}': RLE disagrees with has_mask flag")]
    Inconsistent { image_id: String },
}

/// In-memory label table, one [`ImageRecord`] per CSV row.
pub struct LabelTable {
    pub records: Vec<ImageRecord>,
}

impl LabelTable {
    /// Load a label table from the two-column CSV file.
    ///
    /// Rows split on the first comma only: RLE values contain spaces but
    /// never commas. Blank lines are skipped.
    pub fn from_csv(path: &Path) -> Result<Self, LabelError> {
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        let mut lines = reader.lines();

        let header = lines.next().ok_or(LabelError::Empty)??;
        let mut cols = header.splitn(2, ',');
        let id_col = cols.next().unwrap_or("").trim();
        let rle_col = cols.next().unwrap_or("").trim();
        if id_col != "ImageId" || rle_col != "EncodedPixels" {
            return Err(LabelError::BadHeader(header));
        }

        let mut records = Vec::new();
        for (i, line) in lines.enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let (image_id, rle) = line.split_once(',').ok_or_else(|| LabelError::ShortRow {
                line: i + 2,
                row: line.clone(),
            })?;
            let rle = rle.trim();
            records.push(ImageRecord {
                image_id: image_id.trim().to_string(),
                rle: rle.to_string(),
                has_mask: mask::has_mask(rle),
            });
        }

        Ok(LabelTable { records })
    }

    pub fn from_records(records: Vec<ImageRecord>) -> Self {
        LabelTable { records }
    }

    /// Collapse duplicate identifiers: first occurrence wins, order preserved.
    ///
    /// Images with several annotation rows in the source table keep only
    /// their first label.
    pub fn dedup(&mut self) {
        let mut seen = HashSet::new();
        self.records.retain(|r| seen.insert(r.image_id.clone()));
    }

    /// Record counts as `(with_mask, without_mask)`.
    pub fn counts(&self) -> (usize, usize) {
        let with_mask = self.records.iter().filter(|r| r.has_mask).count();
        (with_mask, self.records.len() - with_mask)
    }

    /// Upsample the minority `has_mask` class by random duplication until
    /// both classes are the same size.
    ///
    /// The seed is an explicit argument so resampling is reproducible
    /// without any process-wide RNG state.
    pub fn resample_balanced(&mut self, seed: u64) {
        let minority: Vec<usize> = {
            let (with_mask, without_mask) = self.counts();
            if with_mask == 0 || without_mask == 0 || with_mask == without_mask {
                return;
            }
            let minority_flag = with_mask < without_mask;
            self.records
                .iter()
                .enumerate()
                .filter(|(_, r)| r.has_mask == minority_flag)
                .map(|(i, _)| i)
                .collect()
        };

        let (with_mask, without_mask) = self.counts();
        let deficit = with_mask.abs_diff(without_mask);
        let mut rng = StdRng::seed_from_u64(seed);
        for _ in 0..deficit {
            if let Some(&i) = minority.choose(&mut rng) {
                let record = self.records[i].clone();
                self.records.push(record);
            }
        }
    }

    /// Decode every label at the given mask dimensions, in parallel, and
    /// check each against its `has_mask` flag.
    ///
    /// Each decode owns its buffers, so the parallel map needs no
    /// coordination. Fails on the first malformed or inconsistent record.
    pub fn validate(&self, height: u32, width: u32) -> Result<(), LabelError> {
        self.records.par_iter().try_for_each(|record| {
            let decoded =
                mask::decode(&record.rle, height, width).map_err(|source| LabelError::BadRle {
                    image_id: record.image_id.clone(),
                    source,
                })?;
            if (decoded.area() > 0) != record.has_mask {
                return Err(LabelError::Inconsistent {
                    image_id: record.image_id.clone(),
                });
            }
            Ok(())
        })
    }
}
