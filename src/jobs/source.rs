//! Dataset and site-list readers
//!
//! The rule dataset is a CSV with a header row and three columns:
//! `site_url, decoration_name, rank`. Rows are grouped per site with set
//! semantics. The survey targets read a plain list of sites, one per line.

use crate::jobs::{RuleSet, SiteJob};
use crate::{DatasetError, DatasetResult};
use std::collections::{BTreeMap, HashMap};
use std::io::Read;
use std::path::{Path, PathBuf};

const EXPECTED_FIELDS: usize = 3;

/// Rules grouped per site, ready to become jobs
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    groups: BTreeMap<String, RuleSet>,
    rows: usize,
    dropped_rows: usize,
}

impl Dataset {
    /// Number of data rows read, header excluded
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Rows skipped because their site did not match the filter
    pub fn dropped_rows(&self) -> usize {
        self.dropped_rows
    }

    /// Number of distinct sites
    pub fn sites(&self) -> usize {
        self.groups.len()
    }

    pub fn rules_for(&self, site: &str) -> Option<&RuleSet> {
        self.groups.get(site)
    }

    /// Turns each site group into a job rooted at `base_dir`
    ///
    /// Sites whose URL cannot be understood are logged and skipped. Sites
    /// sharing a registrable domain share a working directory, so they are
    /// folded into one job under the first such site with the union of their
    /// rules. Jobs come out sorted by site.
    pub fn into_jobs(self, base_dir: &Path) -> Vec<SiteJob> {
        let mut jobs: Vec<SiteJob> = Vec::with_capacity(self.groups.len());
        let mut by_domain: HashMap<String, usize> = HashMap::new();

        for (site, rules) in self.groups {
            let job = match SiteJob::new(site.clone(), rules, base_dir) {
                Ok(job) => job,
                Err(e) => {
                    tracing::warn!("Skipping site {:?}: {}", site, e);
                    continue;
                }
            };

            match by_domain.get(job.domain()) {
                Some(&index) => {
                    tracing::warn!(
                        "{} shares domain {} with {}, merging its rules",
                        site,
                        job.domain(),
                        jobs[index].site()
                    );
                    jobs[index].merge_rules(job.rules().clone());
                }
                None => {
                    by_domain.insert(job.domain().to_string(), jobs.len());
                    jobs.push(job);
                }
            }
        }

        jobs
    }
}

/// Parses a rule dataset from any reader
///
/// # Arguments
///
/// * `reader` - CSV source, header row first
/// * `site_filter` - When set, only rows whose site contains this substring
///   are kept
///
/// # Returns
///
/// * `Ok(Dataset)` - Rows grouped per site
/// * `Err(DatasetError::Malformed)` - A row did not have exactly 3 fields
pub fn parse_dataset<R: Read>(reader: R, site_filter: Option<&str>) -> DatasetResult<Dataset> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let mut dataset = Dataset::default();

    for record in csv_reader.records() {
        let record = record?;

        if record.len() != EXPECTED_FIELDS {
            let line = record.position().map(|p| p.line()).unwrap_or(0);
            return Err(DatasetError::Malformed {
                line,
                fields: record.len(),
            });
        }

        dataset.rows += 1;

        let site = &record[0];
        let decoration = &record[1];

        if let Some(filter) = site_filter {
            if !site.contains(filter) {
                dataset.dropped_rows += 1;
                continue;
            }
        }

        dataset
            .groups
            .entry(site.to_string())
            .or_default()
            .insert(decoration);
    }

    if site_filter.is_some() {
        tracing::info!(
            "Site filter kept {} of {} rows ({} dropped)",
            dataset.rows - dataset.dropped_rows,
            dataset.rows,
            dataset.dropped_rows
        );
    }

    Ok(dataset)
}

/// Reads and parses a rule dataset from disk
pub fn load_dataset(path: &Path, site_filter: Option<&str>) -> DatasetResult<Dataset> {
    let file = std::fs::File::open(path)?;
    parse_dataset(file, site_filter)
}

/// Reads a newline separated site list, skipping blank lines
pub fn load_site_list(path: &Path) -> DatasetResult<Vec<String>> {
    let content = std::fs::read_to_string(path)?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

/// Base directory for a run driven by `input`: `<stem>_data` next to it
///
/// # Examples
///
/// ```
/// use deco_sweep::jobs::base_dir_for;
/// use std::path::Path;
///
/// assert_eq!(
///     base_dir_for(Path::new("lists/decorations.csv")),
///     Path::new("lists/decorations_data")
/// );
/// ```
pub fn base_dir_for(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "sweep".to_string());
    input.with_file_name(format!("{}_data", stem))
}
