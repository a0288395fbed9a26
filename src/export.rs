use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use tracing::info;

use crate::features::FeatureRow;

pub const FEATURE_TABLE_HEADER: &[&str] = &[
    "match_id",
    "date",
    "surface",
    "p1_id",
    "p2_id",
    "p1_rank",
    "p2_rank",
    "rank_diff",
    "p1_elo",
    "p2_elo",
    "elo_diff",
    "p1_elo_momentum",
    "p2_elo_momentum",
    "p1_win_perc",
    "p2_win_perc",
    "p1_surface_win_perc",
    "p2_surface_win_perc",
    "p1_form_last_10",
    "p2_form_last_10",
    "p1_rolling_win_perc_20",
    "p2_rolling_win_perc_20",
    "p1_rolling_win_perc_50",
    "p2_rolling_win_perc_50",
    "p1_matches_last_7_days",
    "p2_matches_last_7_days",
    "p1_matches_last_14_days",
    "p2_matches_last_14_days",
    "fatigue_diff_7_days",
    "fatigue_diff_14_days",
    "p1_sets_last_7_days",
    "p2_sets_last_7_days",
    "p1_sets_last_14_days",
    "p2_sets_last_14_days",
    "fatigue_sets_diff_7_days",
    "fatigue_sets_diff_14_days",
    "p1_rest_days",
    "p2_rest_days",
    "p1_avg_opp_rank_last_10",
    "p2_avg_opp_rank_last_10",
    "p1_h2h_wins",
    "p2_h2h_wins",
    "p1_hand",
    "p2_hand",
    "winner",
];

/// Renders the feature table to CSV text. Field formatting goes through
/// `Display`, so an identical replay renders byte-identical output; the
/// determinism tests compare exactly this.
pub fn render_feature_table(rows: &[FeatureRow]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(FEATURE_TABLE_HEADER)
        .context("write feature table header")?;
    for row in rows {
        writer
            .write_record(row_fields(row))
            .context("write feature table row")?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|err| anyhow!("flush feature table writer: {err}"))?;
    String::from_utf8(bytes).context("feature table is not utf-8")
}

/// Writes the table to `<path>.tmp` and renames it into place only on
/// success, so a failed run never leaves a partial table behind.
pub fn write_feature_table(path: &Path, rows: &[FeatureRow]) -> Result<()> {
    let rendered = render_feature_table(rows)?;
    let tmp = path.with_extension("csv.tmp");
    fs::write(&tmp, rendered)
        .with_context(|| format!("write feature table {}", tmp.display()))?;
    fs::rename(&tmp, path)
        .with_context(|| format!("swap feature table into {}", path.display()))?;
    info!(rows = rows.len(), path = %path.display(), "feature table written");
    Ok(())
}

fn row_fields(row: &FeatureRow) -> Vec<String> {
    let f = &row.features;
    vec![
        f.match_id.clone(),
        f.date.to_rfc3339(),
        f.surface.as_str().to_string(),
        f.p1_id.to_string(),
        f.p2_id.to_string(),
        f.p1_rank.to_string(),
        f.p2_rank.to_string(),
        f.rank_diff.to_string(),
        f.p1_elo.to_string(),
        f.p2_elo.to_string(),
        f.elo_diff.to_string(),
        f.p1_elo_momentum.to_string(),
        f.p2_elo_momentum.to_string(),
        f.p1_win_perc.to_string(),
        f.p2_win_perc.to_string(),
        f.p1_surface_win_perc.to_string(),
        f.p2_surface_win_perc.to_string(),
        f.p1_form_last_10.to_string(),
        f.p2_form_last_10.to_string(),
        f.p1_rolling_win_perc_20.to_string(),
        f.p2_rolling_win_perc_20.to_string(),
        f.p1_rolling_win_perc_50.to_string(),
        f.p2_rolling_win_perc_50.to_string(),
        f.p1_matches_last_7_days.to_string(),
        f.p2_matches_last_7_days.to_string(),
        f.p1_matches_last_14_days.to_string(),
        f.p2_matches_last_14_days.to_string(),
        f.fatigue_diff_7_days.to_string(),
        f.fatigue_diff_14_days.to_string(),
        f.p1_sets_last_7_days.to_string(),
        f.p2_sets_last_7_days.to_string(),
        f.p1_sets_last_14_days.to_string(),
        f.p2_sets_last_14_days.to_string(),
        f.fatigue_sets_diff_7_days.to_string(),
        f.fatigue_sets_diff_14_days.to_string(),
        f.p1_rest_days.to_string(),
        f.p2_rest_days.to_string(),
        f.p1_avg_opp_rank_last_10.to_string(),
        f.p2_avg_opp_rank_last_10.to_string(),
        f.p1_h2h_wins.to_string(),
        f.p2_h2h_wins.to_string(),
        f.p1_hand.as_str().to_string(),
        f.p2_hand.as_str().to_string(),
        row.winner.to_string(),
    ]
}
