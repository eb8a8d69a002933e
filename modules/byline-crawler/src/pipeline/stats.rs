use serde::{Deserialize, Serialize};

/// Summary of the state after a run, plus this run's counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeStats {
    pub total_authors: u32,
    pub with_bio: u32,
    pub with_website: u32,
    pub with_twitter: u32,
    pub with_linkedin: u32,
    pub with_github: u32,
    pub new_this_run: u32,
    pub refs_collected: u32,
    pub urls_processed_this_run: u32,
    pub profiles_processed_this_run: u32,
    pub failures: u32,
    pub total_processed_urls: u32,
    pub total_seen_slugs: u32,
    pub duration_ms: u64,
}

impl std::fmt::Display for ScrapeStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\n=== Byline Run Complete ===")?;
        writeln!(f, "Authors:            {} ({} new)", self.total_authors, self.new_this_run)?;
        writeln!(f, "Refs collected:     {}", self.refs_collected)?;
        writeln!(f, "URLs processed:     {}", self.urls_processed_this_run)?;
        writeln!(f, "Profiles enriched:  {}", self.profiles_processed_this_run)?;
        writeln!(f, "Failures:           {}", self.failures)?;
        writeln!(f, "Duration:           {:.1}s", self.duration_ms as f64 / 1000.0)?;
        let total = self.total_authors.max(1);
        writeln!(f, "\nField coverage:")?;
        for (label, count) in [
            ("Bio", self.with_bio),
            ("Website", self.with_website),
            ("Twitter", self.with_twitter),
            ("LinkedIn", self.with_linkedin),
            ("GitHub", self.with_github),
        ] {
            writeln!(f, "  {label:<9} {count} ({:.0}%)", count as f64 / total as f64 * 100.0)?;
        }
        writeln!(f, "\nAll time:")?;
        writeln!(f, "  URLs processed: {}", self.total_processed_urls)?;
        writeln!(f, "  Slugs seen:     {}", self.total_seen_slugs)?;
        Ok(())
    }
}
