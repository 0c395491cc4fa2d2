//! Site jobs and the sources that produce them
//!
//! A [`SiteJob`] is one site plus the union of its decoration rules. It owns
//! a working directory under the run's base directory, named after the
//! site's registrable domain, holding every output folder and the site log:
//!
//! ```text
//! <base>/<domain>/specific-data/
//! <base>/<domain>/control-data-0 .. control-data-N/
//! <base>/<domain>/<domain>-log
//! ```

mod source;

pub use source::{base_dir_for, load_dataset, load_site_list, parse_dataset, Dataset};

use crate::state::CrawlVariant;
use crate::url::site_identity;
use crate::{SweepError, UrlResult};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use url::Url;

/// Folder receiving both the blank probe and the rule-specific crawl
pub const SPECIFIC_FOLDER: &str = "specific-data";

/// Name of the `index`-th control folder
pub fn control_folder(index: u32) -> String {
    format!("control-data-{}", index)
}

/// Name of the folder a survey variant writes into
pub fn survey_folder(variant: CrawlVariant) -> String {
    format!("{}-data", variant.as_arg())
}

/// Set of decoration rules for one site
///
/// Dataset rows with no rule contribute the empty string. A set holding
/// nothing but that empty marker means "probe the site without rules"; when
/// real rules are present the marker is ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleSet {
    rules: BTreeSet<String>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a comma separated rule list as given on the command line
    pub fn from_rule_string(rules: &str) -> Self {
        rules.split(',').map(str::to_string).collect()
    }

    /// Adds a rule; duplicates merge
    pub fn insert(&mut self, rule: impl Into<String>) -> bool {
        self.rules.insert(rule.into())
    }

    /// Returns true when the set carries no real rule
    pub fn is_blank(&self) -> bool {
        self.rules.iter().all(|rule| rule.is_empty())
    }

    /// The rules to apply, with the empty marker stripped
    pub fn effective_rules(&self) -> Vec<&str> {
        self.rules
            .iter()
            .filter(|rule| !rule.is_empty())
            .map(String::as_str)
            .collect()
    }

    /// The rule string handed to the crawl tool's `-s` flag
    pub fn joined(&self) -> String {
        self.effective_rules().join(",")
    }

    /// Adds every rule of `other`; duplicates merge
    pub fn merge(&mut self, other: RuleSet) {
        self.rules.extend(other.rules);
    }

    /// Number of entries, counting the empty marker
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl FromIterator<String> for RuleSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self {
            rules: iter.into_iter().collect(),
        }
    }
}

/// One site to process, with its rules and working directory
#[derive(Debug, Clone)]
pub struct SiteJob {
    site: String,
    url: Url,
    domain: String,
    rules: RuleSet,
    work_dir: PathBuf,
}

impl SiteJob {
    /// Creates a job for `site` whose working directory lives under `base_dir`
    ///
    /// The directory itself is not created until [`SiteJob::ensure_work_dir`].
    pub fn new(site: impl Into<String>, rules: RuleSet, base_dir: &Path) -> UrlResult<Self> {
        let site = site.into();
        let (url, domain) = site_identity(&site)?;
        let work_dir = base_dir.join(&domain);

        Ok(Self {
            site,
            url,
            domain,
            rules,
            work_dir,
        })
    }

    /// The site exactly as listed; this is what the crawl tool receives
    pub fn site(&self) -> &str {
        &self.site
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Folds another site's rules into this job
    ///
    /// Used when two listed sites share a registrable domain and therefore a
    /// working directory.
    pub fn merge_rules(&mut self, rules: RuleSet) {
        self.rules.merge(rules);
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// The per-site log every attempt appends to
    pub fn log_path(&self) -> PathBuf {
        self.work_dir.join(format!("{}-log", self.domain))
    }

    /// Path of a named output folder inside the working directory
    pub fn folder(&self, name: &str) -> PathBuf {
        self.work_dir.join(name)
    }

    /// Creates the working directory if it does not exist yet
    ///
    /// A directory that already exists, including one created concurrently,
    /// is fine.
    pub async fn ensure_work_dir(&self) -> Result<(), SweepError> {
        tokio::fs::create_dir_all(&self.work_dir)
            .await
            .map_err(|source| SweepError::Workspace {
                path: self.work_dir.clone(),
                source,
            })
    }
}
