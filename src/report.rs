use crate::models::MigrationResult;
use std::fmt;

const RULE: &str = "==================================================";

impl fmt::Display for MigrationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", RULE)?;
        if self.dry_run {
            writeln!(f, "DRY RUN MODE - No changes were made to playlists")?;
            writeln!(f, "{}", RULE)?;
            writeln!(f, "Summary (potential changes):")?;
            writeln!(f, "- Videos in 'Watch later': {}", self.planned)?;
            writeln!(f, "- Videos that would be added to unlisted playlist: {}", self.would_add.len())?;
            writeln!(f, "- Videos already in unlisted playlist: {}", self.would_skip.len())?;
            writeln!(
                f,
                "- Videos that would be removed from 'Watch later' playlist: {}",
                self.would_add.len() + self.would_skip.len()
            )?;
            return Ok(());
        }

        if self.has_failures() {
            writeln!(f, "Operation completed with {} failure(s)", self.failures.len())?;
        } else {
            writeln!(f, "Operation completed successfully!")?;
        }
        writeln!(f, "{}", RULE)?;
        writeln!(f, "Summary:")?;
        writeln!(f, "- Videos in 'Watch later': {}", self.planned)?;
        writeln!(f, "- Videos added to unlisted playlist: {}", self.added.len())?;
        writeln!(f, "- Videos already in unlisted playlist: {}", self.skipped_duplicate.len())?;
        writeln!(f, "- Videos removed from 'Watch later' playlist: {}", self.removed.len())?;
        writeln!(f, "- Insert failures (left in 'Watch later'): {}", self.insert_failures().count())?;
        writeln!(
            f,
            "- Delete failures (in both playlists): {}",
            self.delete_failures().count()
        )?;
        for failure in &self.failures {
            writeln!(
                f,
                "  {} {} ({}): {}",
                failure.kind, failure.item.video_id, failure.item.title, failure.reason
            )?;
        }
        Ok(())
    }
}
