/// Stage and variant definitions for a site's crawl attempts
use std::fmt;

/// Blocking method handed to the crawl tool with `-q`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrawlVariant {
    /// No blocking; baseline crawl
    None,
    /// Block third-party decorations
    Third,
    /// Replace decorations with placeholder values
    Replace,
    /// Block every decoration
    All,
    /// Block only the decorations named by a rule string
    Specific,
}

impl CrawlVariant {
    /// The value passed on the crawl tool's command line
    pub fn as_arg(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Third => "third",
            Self::Replace => "replace",
            Self::All => "all",
            Self::Specific => "specific",
        }
    }

    /// Variants swept by a survey, in the order they are tried
    pub fn survey_variants() -> [Self; 3] {
        [Self::All, Self::Third, Self::Replace]
    }
}

impl fmt::Display for CrawlVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_arg())
    }
}

/// The purpose an attempt serves within a site's run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Baseline probe for a site that has no rules
    Blank,
    /// Crawl with the site's rules applied
    Specific,
    /// Replicate baseline crawl gathered after a positive signal
    Control,
    /// One variant of a survey sweep
    Survey(CrawlVariant),
}

impl Stage {
    /// The crawl variant this stage runs under
    pub fn variant(&self) -> CrawlVariant {
        match self {
            Self::Blank | Self::Control => CrawlVariant::None,
            Self::Specific => CrawlVariant::Specific,
            Self::Survey(variant) => *variant,
        }
    }

    /// Whether success also needs the unblocked-run marker in the log
    pub fn requires_sentinel(&self) -> bool {
        matches!(self, Self::Specific)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Blank => "blank",
            Self::Specific => "specific",
            Self::Control => "control",
            Self::Survey(CrawlVariant::None) => "survey-none",
            Self::Survey(CrawlVariant::Third) => "survey-third",
            Self::Survey(CrawlVariant::Replace) => "survey-replace",
            Self::Survey(CrawlVariant::All) => "survey-all",
            Self::Survey(CrawlVariant::Specific) => "survey-specific",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
