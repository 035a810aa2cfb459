//! BACE CSV reader with full input validation.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};

use crate::DataError;
use crate::domain::{Dataset, Mode, MoleculeId, SplitAssignment, TaskName};

/// Raw BACE table, as parsed from disk.
///
/// Holds every column of the input file: molecule identity, both label
/// columns, any curated split-assignment columns, and the precomputed
/// numeric feature columns. The loader turns this into mode-specific
/// [`Dataset`] partitions.
#[derive(Debug)]
pub struct BaceTable {
    ids: Vec<MoleculeId>,
    smiles: Vec<String>,
    class_labels: Vec<f64>,
    pic50: Vec<f64>,
    assignments: BTreeMap<String, Vec<SplitAssignment>>,
    feature_names: Vec<String>,
    features: Vec<Vec<f64>>,
}

impl BaceTable {
    /// Return the number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Return `true` if the table has zero rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Return the SMILES strings.
    #[must_use]
    pub fn smiles(&self) -> &[String] {
        &self.smiles
    }

    /// Return the feature column names.
    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Return the per-row assignments of a curated split column, if present.
    #[must_use]
    pub fn assignments(&self, column: &str) -> Option<&[SplitAssignment]> {
        self.assignments.get(column).map(Vec::as_slice)
    }

    /// Build a single-task [`Dataset`] over the label column of `mode`.
    ///
    /// Every row gets weight 1.0.
    ///
    /// # Errors
    ///
    /// Propagates [`Dataset::new`] validation errors; cannot fail on a
    /// table this reader produced.
    pub fn to_dataset(&self, mode: Mode) -> Result<Dataset, DataError> {
        let label_column = match mode {
            Mode::Classification => &self.class_labels,
            Mode::Regression => &self.pic50,
        };
        Dataset::new(
            self.ids.clone(),
            self.smiles.clone(),
            vec![TaskName::new(mode.label_column())],
            self.feature_names.clone(),
            self.features.clone(),
            label_column.iter().map(|&v| vec![v]).collect(),
            vec![1.0; self.len()],
        )
    }
}

/// Reads the BACE benchmark CSV.
///
/// Expected format:
/// - Header row required.
/// - Fixed columns `mol` (SMILES), `CID` (molecule ID), `Class` (0/1
///   activity), `pIC50` (potency).
/// - Zero or more curated assignment columns whose names start with
///   `split_`, each cell one of Train/Valid/Test/Crystal.
/// - Every remaining column is a precomputed numeric feature.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`DataError::FileNotFound`] | File doesn't exist or is unreadable |
/// | [`DataError::CsvParse`] | Malformed CSV record |
/// | [`DataError::MissingColumn`] | A fixed column is absent |
/// | [`DataError::EmptyTable`] | Zero data rows after header |
/// | [`DataError::InconsistentRowLength`] | Row width differs from header |
/// | [`DataError::NonFiniteValue`] | Numeric cell is NaN, Inf, or unparseable |
/// | [`DataError::DuplicateMoleculeId`] | Same CID appears twice |
/// | [`DataError::UnknownAssignment`] | Split cell not Train/Valid/Test/Crystal |
pub struct BaceReader {
    path: PathBuf,
}

const SMILES_COLUMN: &str = "mol";
const ID_COLUMN: &str = "CID";
const CLASS_COLUMN: &str = "Class";
const PIC50_COLUMN: &str = "pIC50";
const SPLIT_PREFIX: &str = "split_";

impl BaceReader {
    /// Create a new reader for the given CSV file path.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// Read and validate the CSV file, returning a [`BaceTable`].
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn read(&self) -> Result<BaceTable, DataError> {
        let file = std::fs::File::open(&self.path).map_err(|e| DataError::FileNotFound {
            path: self.path.clone(),
            source: e,
        })?;

        // flexible(true) lets our own InconsistentRowLength check fire
        // instead of a low-level CsvParse error.
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(file);

        let header = rdr
            .headers()
            .map_err(|e| DataError::CsvParse {
                path: self.path.clone(),
                offset: e.position().map_or(0, |p| p.byte()),
                source: e,
            })?
            .clone();
        let expected_cols = header.len();

        // Map the header into fixed, assignment, and feature columns.
        let column_index = |name: &str| -> Result<usize, DataError> {
            header
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| DataError::MissingColumn {
                    path: self.path.clone(),
                    column: name.to_string(),
                })
        };
        let smiles_idx = column_index(SMILES_COLUMN)?;
        let id_idx = column_index(ID_COLUMN)?;
        let class_idx = column_index(CLASS_COLUMN)?;
        let pic50_idx = column_index(PIC50_COLUMN)?;

        let mut assignment_cols: Vec<(usize, String)> = Vec::new();
        let mut feature_cols: Vec<(usize, String)> = Vec::new();
        for (idx, name) in header.iter().enumerate() {
            if idx == smiles_idx || idx == id_idx || idx == class_idx || idx == pic50_idx {
                continue;
            }
            if name.starts_with(SPLIT_PREFIX) {
                assignment_cols.push((idx, name.to_string()));
            } else {
                feature_cols.push((idx, name.to_string()));
            }
        }
        debug!(
            n_assignment_cols = assignment_cols.len(),
            n_feature_cols = feature_cols.len(),
            "header mapped"
        );

        let mut ids = Vec::new();
        let mut smiles = Vec::new();
        let mut class_labels = Vec::new();
        let mut pic50 = Vec::new();
        let mut assignments: BTreeMap<String, Vec<SplitAssignment>> = assignment_cols
            .iter()
            .map(|(_, name)| (name.clone(), Vec::new()))
            .collect();
        let mut features = Vec::new();
        let mut seen: HashMap<String, usize> = HashMap::new();

        for (row_index, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| DataError::CsvParse {
                path: self.path.clone(),
                offset: e.position().map_or(0, |p| p.byte()),
                source: e,
            })?;

            if record.len() != expected_cols {
                return Err(DataError::InconsistentRowLength {
                    path: self.path.clone(),
                    row_index,
                    expected: expected_cols,
                    got: record.len(),
                });
            }

            let id_str = record.get(id_idx).unwrap_or("").to_string();
            if let Some(&first_row) = seen.get(&id_str) {
                return Err(DataError::DuplicateMoleculeId {
                    path: self.path.clone(),
                    id: id_str,
                    first_row,
                    second_row: row_index,
                });
            }
            seen.insert(id_str.clone(), row_index);

            let parse_float = |col_idx: usize, column: &str| -> Result<f64, DataError> {
                let raw = record.get(col_idx).unwrap_or("");
                let value: f64 = raw.parse().map_err(|_| DataError::NonFiniteValue {
                    path: self.path.clone(),
                    row_index,
                    column: column.to_string(),
                    raw: raw.to_string(),
                })?;
                if !value.is_finite() {
                    return Err(DataError::NonFiniteValue {
                        path: self.path.clone(),
                        row_index,
                        column: column.to_string(),
                        raw: raw.to_string(),
                    });
                }
                Ok(value)
            };

            class_labels.push(parse_float(class_idx, CLASS_COLUMN)?);
            pic50.push(parse_float(pic50_idx, PIC50_COLUMN)?);

            for (col_idx, name) in &assignment_cols {
                let raw = record.get(*col_idx).unwrap_or("");
                let assignment =
                    SplitAssignment::parse(raw).ok_or_else(|| DataError::UnknownAssignment {
                        path: self.path.clone(),
                        row_index,
                        column: name.clone(),
                        value: raw.to_string(),
                    })?;
                assignments
                    .get_mut(name)
                    .expect("assignment column registered from header")
                    .push(assignment);
            }

            let mut row = Vec::with_capacity(feature_cols.len());
            for (col_idx, name) in &feature_cols {
                row.push(parse_float(*col_idx, name)?);
            }
            features.push(row);

            ids.push(MoleculeId::new(id_str));
            smiles.push(record.get(smiles_idx).unwrap_or("").to_string());
        }

        if ids.is_empty() {
            return Err(DataError::EmptyTable {
                path: self.path.clone(),
            });
        }

        info!(
            n_molecules = ids.len(),
            n_features = feature_cols.len(),
            "BACE table loaded"
        );

        Ok(BaceTable {
            ids,
            smiles,
            class_labels,
            pic50,
            assignments,
            feature_names: feature_cols.into_iter().map(|(_, name)| name).collect(),
            features,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_csv(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f.flush().unwrap();
        f
    }

    const VALID: &str = "\
mol,CID,Class,pIC50,split_20_80,f0,f1
c1ccccc1,BACE_1,1,7.5,Train,0.1,1.0
CCO,BACE_2,0,4.2,Valid,0.2,2.0
CCN,BACE_3,1,6.9,Test,0.3,3.0
CCC,BACE_4,0,5.0,Crystal,0.4,4.0
";

    #[test]
    fn read_valid_table() {
        let f = write_csv(VALID);
        let table = BaceReader::new(f.path()).read().unwrap();
        assert_eq!(table.len(), 4);
        assert_eq!(table.feature_names(), &["f0".to_string(), "f1".to_string()]);
        assert_eq!(table.smiles()[0], "c1ccccc1");

        let assigned = table.assignments("split_20_80").unwrap();
        assert_eq!(assigned[0], SplitAssignment::Train);
        assert_eq!(assigned[3], SplitAssignment::Crystal);
        assert!(table.assignments("split_80_20").is_none());
    }

    #[test]
    fn to_dataset_selects_label_column() {
        let f = write_csv(VALID);
        let table = BaceReader::new(f.path()).read().unwrap();

        let cls = table.to_dataset(Mode::Classification).unwrap();
        assert_eq!(cls.tasks()[0].as_str(), "Class");
        assert_eq!(cls.labels_for_task(0).unwrap(), vec![1.0, 0.0, 1.0, 0.0]);

        let reg = table.to_dataset(Mode::Regression).unwrap();
        assert_eq!(reg.tasks()[0].as_str(), "pIC50");
        assert_eq!(reg.labels_for_task(0).unwrap(), vec![7.5, 4.2, 6.9, 5.0]);
        assert_eq!(reg.weights(), &[1.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn error_file_not_found() {
        let result = BaceReader::new(Path::new("/nonexistent/bace.csv")).read();
        assert!(matches!(result, Err(DataError::FileNotFound { .. })));
    }

    #[test]
    fn error_missing_column() {
        let f = write_csv("mol,CID,Class\nCCO,BACE_1,1\n");
        let result = BaceReader::new(f.path()).read();
        assert!(matches!(
            result,
            Err(DataError::MissingColumn { column, .. }) if column == "pIC50"
        ));
    }

    #[test]
    fn error_empty_table() {
        let f = write_csv("mol,CID,Class,pIC50,f0\n");
        let result = BaceReader::new(f.path()).read();
        assert!(matches!(result, Err(DataError::EmptyTable { .. })));
    }

    #[test]
    fn error_inconsistent_row_length() {
        let f = write_csv("mol,CID,Class,pIC50,f0\nCCO,BACE_1,1,7.5,0.1\nCCN,BACE_2,0,4.2\n");
        let result = BaceReader::new(f.path()).read();
        assert!(matches!(
            result,
            Err(DataError::InconsistentRowLength { row_index: 1, .. })
        ));
    }

    #[test]
    fn error_non_finite_feature() {
        let f = write_csv("mol,CID,Class,pIC50,f0\nCCO,BACE_1,1,7.5,NaN\n");
        let result = BaceReader::new(f.path()).read();
        assert!(matches!(
            result,
            Err(DataError::NonFiniteValue { column, .. }) if column == "f0"
        ));
    }

    #[test]
    fn error_unparseable_label() {
        let f = write_csv("mol,CID,Class,pIC50,f0\nCCO,BACE_1,active,7.5,0.1\n");
        let result = BaceReader::new(f.path()).read();
        assert!(matches!(
            result,
            Err(DataError::NonFiniteValue { column, .. }) if column == "Class"
        ));
    }

    #[test]
    fn error_duplicate_molecule_id() {
        let f = write_csv(
            "mol,CID,Class,pIC50,f0\nCCO,BACE_1,1,7.5,0.1\nCCN,BACE_2,0,4.2,0.2\nCCC,BACE_1,1,6.0,0.3\n",
        );
        let result = BaceReader::new(f.path()).read();
        assert!(matches!(
            result,
            Err(DataError::DuplicateMoleculeId {
                first_row: 0,
                second_row: 2,
                ..
            })
        ));
    }

    #[test]
    fn error_unknown_assignment() {
        let f = write_csv("mol,CID,Class,pIC50,split_20_80,f0\nCCO,BACE_1,1,7.5,Holdout,0.1\n");
        let result = BaceReader::new(f.path()).read();
        assert!(matches!(
            result,
            Err(DataError::UnknownAssignment { value, .. }) if value == "Holdout"
        ));
    }
}
