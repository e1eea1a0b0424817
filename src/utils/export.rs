use std::path::{Path, PathBuf};

use tracing::info;

use crate::dashboard::{DashboardReport, LiveData};
use crate::engine::analytics::Analytics;
use crate::errors::AppError;
use crate::models::analytics::{CorrelationMatrix, RiskSummary};

/// Write the normalized price panel: one row per date, one column per symbol.
/// Dates before a symbol's first observation are empty cells.
pub fn write_normalized_csv(analytics: &Analytics, path: &Path) -> Result<(), AppError> {
    let mut wtr = csv::Writer::from_path(path)
        .map_err(|e| AppError::FileWrite(format!("Cannot create CSV: {}", e)))?;

    let symbols: Vec<_> = analytics.symbols().cloned().collect();
    let mut header = vec!["Date".to_string()];
    header.extend(symbols.iter().map(|s| s.to_string()));
    wtr.write_record(&header)
        .map_err(|e| AppError::FileWrite(e.to_string()))?;

    let normalized = &analytics.entry().normalized;
    for date in analytics.prices().dates() {
        let mut row = vec![date.format("%Y-%m-%d").to_string()];
        for s in &symbols {
            let value = normalized.get(s).and_then(|n| n.value_at(*date));
            row.push(fmt_opt(value, 4));
        }
        wtr.write_record(&row)
            .map_err(|e| AppError::FileWrite(e.to_string()))?;
    }

    wtr.flush().map_err(|e| AppError::FileWrite(e.to_string()))?;
    Ok(())
}

/// Write per-symbol risk statistics. Too-short series get empty statistic cells.
pub fn write_risk_csv<'a>(
    summaries: impl IntoIterator<Item = &'a RiskSummary>,
    path: &Path,
) -> Result<(), AppError> {
    let mut wtr = csv::Writer::from_path(path)
        .map_err(|e| AppError::FileWrite(format!("Cannot create CSV: {}", e)))?;

    wtr.write_record([
        "Symbol",
        "Observations",
        "Mean Daily Return",
        "Std Dev Daily Return",
        "Annualized Return %",
        "Annualized Volatility %",
    ])
    .map_err(|e| AppError::FileWrite(e.to_string()))?;

    for r in summaries {
        let stats = r.stats.as_ref();
        wtr.write_record([
            r.symbol.to_string(),
            r.observations.to_string(),
            fmt_opt(stats.map(|s| s.mean_return), 6),
            fmt_opt(stats.map(|s| s.std_dev_return), 6),
            fmt_opt(stats.map(|s| s.annualized_return * 100.0), 2),
            fmt_opt(stats.map(|s| s.annualized_volatility * 100.0), 2),
        ])
        .map_err(|e| AppError::FileWrite(e.to_string()))?;
    }

    wtr.flush().map_err(|e| AppError::FileWrite(e.to_string()))?;
    Ok(())
}

/// Write the correlation matrix with symbols as both header row and first column.
pub fn write_correlation_csv(matrix: &CorrelationMatrix, path: &Path) -> Result<(), AppError> {
    let mut wtr = csv::Writer::from_path(path)
        .map_err(|e| AppError::FileWrite(format!("Cannot create CSV: {}", e)))?;

    let mut header = vec![String::new()];
    header.extend(matrix.symbols.iter().map(|s| s.to_string()));
    wtr.write_record(&header)
        .map_err(|e| AppError::FileWrite(e.to_string()))?;

    for (symbol, cells) in matrix.symbols.iter().zip(&matrix.cells) {
        let mut row = vec![symbol.to_string()];
        row.extend(cells.iter().map(|c| fmt_opt(c.coefficient, 4)));
        wtr.write_record(&row)
            .map_err(|e| AppError::FileWrite(e.to_string()))?;
    }

    wtr.flush().map_err(|e| AppError::FileWrite(e.to_string()))?;
    Ok(())
}

/// Write the full report as pretty-printed JSON.
pub fn write_report_json(report: &DashboardReport, path: &Path) -> Result<(), AppError> {
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(path, json)
        .map_err(|e| AppError::FileWrite(format!("Cannot write {}: {}", path.display(), e)))?;
    Ok(())
}

/// Export everything into `dir`. The CSVs are only written while live data is ready.
pub fn export_all(
    report: &DashboardReport,
    live: &LiveData,
    dir: &Path,
) -> Result<Vec<PathBuf>, AppError> {
    std::fs::create_dir_all(dir)
        .map_err(|e| AppError::FileWrite(format!("Cannot create {}: {}", dir.display(), e)))?;

    let mut written = Vec::new();
    if let Some(analytics) = live.analytics() {
        let path = dir.join("normalized_prices.csv");
        write_normalized_csv(analytics, &path)?;
        written.push(path);

        let path = dir.join("risk_summary.csv");
        write_risk_csv(analytics.risk_summaries(), &path)?;
        written.push(path);

        let path = dir.join("correlation.csv");
        write_correlation_csv(analytics.correlation_matrix(), &path)?;
        written.push(path);
    }

    let path = dir.join("report.json");
    write_report_json(report, &path)?;
    written.push(path);

    info!("Exported {} files to {}", written.len(), dir.display());
    Ok(written)
}

/// Not-available values become empty cells, never zero.
fn fmt_opt(value: Option<f64>, decimals: usize) -> String {
    match value {
        Some(v) => format!("{:.*}", decimals, v),
        None => String::new(),
    }
}
