use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use ledger_harmonize::loader::{
    load_account_mappings, load_cost_center_mappings, load_raw_financial_rows, load_raw_vendors,
    load_raw_vendors_for, preview_path, regenerate_previews, write_preview_rows, write_raw_vendor_rows,
    write_vendor_rows,
};
use ledger_harmonize::{
    AppConfig, CrossBrandComparison, DataQualityAnalytics, GovernanceStore, HarmonizationEngine,
    MappingImpact, SqliteGovernanceStore, SubmissionAnalytics, SubmissionLedger, SubmissionStatus,
    VarianceAnalytics, VendorHarmonizationAnalytics, VendorRules,
};

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

#[derive(Parser, Debug)]
#[command(name = "ledger-harmonize")]
#[command(about = "Vendor harmonization and financial reconciliation across two brand ledgers")]
struct Cli {
    /// JSON config file (missing file means defaults)
    #[arg(long, env = "HARMONIZE_CONFIG", default_value = "harmonize.json")]
    config: PathBuf,

    /// Overrides data_dir from the config file
    #[arg(long, env = "HARMONIZE_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Recorded on governance events and workflow transitions
    #[arg(long, env = "HARMONIZE_ACTOR", default_value = "cli")]
    actor: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Harmonize both vendor ledgers and export the unified registry
    Vendors {
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Export raw vendor rows with a Source_Brand column
    RawVendors {
        /// Only this brand; both when omitted
        #[arg(long)]
        brand: Option<String>,

        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// List blocking variances, or the cross-brand comparison
    Variances {
        #[arg(long)]
        brand: Option<String>,

        #[arg(long)]
        cross_brand: bool,
    },
    /// Build and save a brand's submission preview
    Preview {
        #[arg(long)]
        brand: String,
    },
    /// Submit a brand to corporate
    Submit {
        #[arg(long)]
        brand: String,
    },
    Approve { submission_id: String },
    Reject { submission_id: String },
    /// Approved rows grouped by unified account and cost center
    Corporate,
    Analytics {
        #[arg(long)]
        brand: Option<String>,
    },
    /// Load mapping CSVs (and vendor_rules.json if present) into the governance database
    ImportMappings,
    /// Pin two raw names (one per brand) to one unified vendor
    Override {
        unified_name: String,
        brand_a_name: String,
        brand_b_name: String,
    },
    /// Force unified vendors into one record
    Merge {
        #[arg(long, num_args = 2.., required = true)]
        ids: Vec<String>,

        #[arg(long)]
        name: String,

        #[arg(long, default_value = "")]
        address: String,

        #[arg(long, default_value = "")]
        phone: String,
    },
    /// Wipe submissions, submission rows and approved rows, then rebuild previews
    Reset,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ledger_harmonize=info".into()),
        )
        .init();

    let cli = Cli::parse();

    let mut config = AppConfig::load_or_default(&cli.config)?;
    if let Some(data_dir) = cli.data_dir.clone() {
        config = config.with_data_dir(data_dir);
    }
    info!(data_dir = %config.data_dir.display(), "configuration loaded");

    match cli.command {
        Command::Vendors { output } => run_vendors(&config, output),
        Command::RawVendors { brand, output } => run_raw_vendors(&config, brand.as_deref(), output),
        Command::Variances { brand, cross_brand } => run_variances(&config, brand.as_deref(), cross_brand),
        Command::Preview { brand } => run_preview(&config, &brand),
        Command::Submit { brand } => run_submit(&config, &brand),
        Command::Approve { submission_id } => run_update_status(&config, &submission_id, SubmissionStatus::Approved),
        Command::Reject { submission_id } => run_update_status(&config, &submission_id, SubmissionStatus::Rejected),
        Command::Corporate => run_corporate(&config),
        Command::Analytics { brand } => run_analytics(&config, brand.as_deref()),
        Command::ImportMappings => run_import_mappings(&config, &cli.actor),
        Command::Override {
            unified_name,
            brand_a_name,
            brand_b_name,
        } => {
            let store = open_store(&config)?;
            let rule = store.add_override(&unified_name, &brand_a_name, &brand_b_name, &cli.actor)?;
            println!("✓ Override saved: {} → {}", rule.key(), rule.unified_name);
            Ok(())
        }
        Command::Merge {
            ids,
            name,
            address,
            phone,
        } => {
            let store = open_store(&config)?;
            let ids: Vec<&str> = ids.iter().map(|id| id.as_str()).collect();
            let rule = store.add_manual_merge(&ids, &name, &address, &phone, &cli.actor)?;
            println!(
                "✓ Manual merge saved: {} → {}",
                rule.key(),
                rule.unified_name.as_deref().unwrap_or_default()
            );
            Ok(())
        }
        Command::Reset => run_reset(&config),
    }
}

fn open_store(config: &AppConfig) -> Result<SqliteGovernanceStore> {
    let path = config.database_path();
    ensure_parent(&path)?;
    SqliteGovernanceStore::open(&path)
        .with_context(|| format!("Failed to open governance database {}", path.display()))
}

fn open_ledger(config: &AppConfig) -> Result<SubmissionLedger> {
    let path = config.ledger_path();
    SubmissionLedger::open(&path).with_context(|| format!("Failed to open submission ledger {}", path.display()))
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

fn run_vendors(config: &AppConfig, output: Option<PathBuf>) -> Result<()> {
    println!("🔍 Vendor Harmonization - {} + {}", config.brand_a, config.brand_b);
    println!("{}", RULE);

    let source_a = load_raw_vendors(&config.data_dir, &config.brand_a)?;
    let source_b = load_raw_vendors(&config.data_dir, &config.brand_b)?;
    println!("\n📂 Loaded {} {} vendors, {} {} vendors", source_a.len(), config.brand_a, source_b.len(), config.brand_b);

    let snapshot = open_store(config)?.snapshot()?;
    let engine = HarmonizationEngine::new(&config.brand_a, &config.brand_b);
    let report = engine.harmonize(&source_a, &source_b, &snapshot.vendor_rules);

    let output = output.unwrap_or_else(|| config.data_dir.join("unified_vendors.csv"));
    write_vendor_rows(&output, &report.rows)?;

    println!("\n{}", RULE);
    println!("✅ {}", report.summary());
    println!("✓ Written to {}", output.display());
    Ok(())
}

fn run_raw_vendors(config: &AppConfig, brand: Option<&str>, output: Option<PathBuf>) -> Result<()> {
    let records = load_raw_vendors_for(&config.data_dir, &config.brands(), brand)?;

    let file_name = match brand {
        Some(b) => format!("raw_vendors_{}.csv", b.trim().to_lowercase()),
        None => "raw_vendors.csv".to_string(),
    };
    let output = output.unwrap_or_else(|| config.data_dir.join(file_name));
    write_raw_vendor_rows(&output, &records)?;

    println!("✓ {} raw vendor row(s) written to {}", records.len(), output.display());
    Ok(())
}

fn run_variances(config: &AppConfig, brand: Option<&str>, cross_brand: bool) -> Result<()> {
    let rows = load_raw_financial_rows(&config.data_dir, brand)?;
    let snapshot = open_store(config)?.snapshot()?;
    let engine = snapshot.reconciliation();

    if cross_brand {
        let unified = engine.unify_rows(&rows);
        let variances = CrossBrandComparison::new(&config.brand_a, &config.brand_b).compare(&unified);

        println!("🔀 Cross-brand comparison: {} variance(s)", variances.len());
        for v in &variances {
            println!("  [{:?}] {} {} - {}", v.variance_type, v.unified_account_number, v.unified_account_name, v.message);
        }
        return Ok(());
    }

    let variances = engine.variances(&rows);
    println!("⚠️  {} variance(s)", variances.len());
    for v in &variances {
        println!("  [{}] {}: {}", v.variance_type, v.brand, v.message);
    }
    Ok(())
}

fn run_preview(config: &AppConfig, brand: &str) -> Result<()> {
    let rows = load_raw_financial_rows(&config.data_dir, Some(brand))?;
    let snapshot = open_store(config)?.snapshot()?;
    let summary = snapshot.reconciliation().preview_summary(brand, &rows);

    let path = preview_path(&config.data_dir, brand);
    write_preview_rows(&path, &summary.rows)?;

    let mut ledger = open_ledger(config)?;
    let state = ledger.sync_readiness(&summary)?;

    println!("📋 {}", summary.summary());
    println!("✓ Workflow state: {}", state);
    println!("✓ Preview written to {}", path.display());
    Ok(())
}

fn run_submit(config: &AppConfig, brand: &str) -> Result<()> {
    let rows = load_raw_financial_rows(&config.data_dir, Some(brand))?;
    let snapshot = open_store(config)?.snapshot()?;
    let mut ledger = open_ledger(config)?;

    let outcome = ledger.submit(brand, &rows, &snapshot)?;
    if outcome.is_submitted() {
        println!("📤 {}", outcome.message());
    } else {
        println!("❌ {}", outcome.message());
    }
    Ok(())
}

fn run_update_status(config: &AppConfig, submission_id: &str, status: SubmissionStatus) -> Result<()> {
    let mut ledger = open_ledger(config)?;
    ledger.update_status(submission_id, status)?;
    println!("✓ Submission {} is now {}", submission_id, status);
    Ok(())
}

fn run_corporate(config: &AppConfig) -> Result<()> {
    let ledger = open_ledger(config)?;
    let view = ledger.corporate_view();

    println!("🏢 Corporate view ({} buckets)", view.len());
    println!("{}", RULE);
    for row in &view {
        println!(
            "  {:<12} {:<12} {:>14.2}  [{}]",
            row.unified_account,
            row.unified_cost_center,
            row.amount,
            row.contributing_brands.join(", ")
        );
    }
    Ok(())
}

fn run_analytics(config: &AppConfig, brand: Option<&str>) -> Result<()> {
    let rows = load_raw_financial_rows(&config.data_dir, brand)?;
    let snapshot = open_store(config)?.snapshot()?;
    let engine = snapshot.reconciliation();
    let ledger = open_ledger(config)?;

    let quality = DataQualityAnalytics::compute(&engine, &rows);
    let variances = VarianceAnalytics::from_variances(&engine.variances(&rows));
    let submissions = SubmissionAnalytics::compute(&ledger, brand);
    let impact = MappingImpact::compute(&snapshot, &rows);

    let source_a = load_raw_vendors(&config.data_dir, &config.brand_a)?;
    let source_b = load_raw_vendors(&config.data_dir, &config.brand_b)?;
    let report = HarmonizationEngine::new(&config.brand_a, &config.brand_b).harmonize(
        &source_a,
        &source_b,
        &snapshot.vendor_rules,
    );
    let vendors = VendorHarmonizationAnalytics::compute(&report.rows, &config.brand_a, &config.brand_b);

    println!("📊 Analytics");
    println!("{}", RULE);
    println!("Data quality:  {}", quality.summary());
    println!("Variances:     {} {:?}", variances.total_variances, variances.by_type);
    println!(
        "Submissions:   {} {:?} avg approval {}",
        submissions.total_submissions,
        submissions.by_status,
        submissions
            .avg_time_to_approve
            .map(|h| format!("{:.1}h", h))
            .unwrap_or_else(|| "n/a".to_string())
    );
    println!(
        "Mappings:      {} accounts, {} cost centers, {} source accounts",
        impact.total_account_mappings, impact.total_cost_center_mappings, impact.total_source_accounts
    );
    println!("Vendors:       {} harmonized, {} unmatched", vendors.harmonized_count, vendors.unmatched_count);
    for v in &vendors.vendor_confidence_scores {
        println!("  {:>3}  {}{}", v.confidence_score, v.vendor_name, if v.is_harmonized { " ✓" } else { "" });
    }
    Ok(())
}

fn run_import_mappings(config: &AppConfig, actor: &str) -> Result<()> {
    println!("🗄️  Importing mappings into {}", config.database_path().display());
    println!("{}", RULE);

    let store = open_store(config)?;

    let accounts = load_account_mappings(&config.data_dir)?;
    let account_count = accounts.len();
    store.replace_account_mappings(accounts, actor)?;
    println!("✓ {} account mappings", account_count);

    let cost_centers = load_cost_center_mappings(&config.data_dir)?;
    let cost_center_count = cost_centers.len();
    store.replace_cost_center_mappings(cost_centers, actor)?;
    println!("✓ {} cost center mappings", cost_center_count);

    let rules_path = config.data_dir.join("vendor_rules.json");
    if rules_path.exists() {
        let rules = VendorRules::from_file(&rules_path)?;
        store.save_vendor_rules(rules, actor)?;
        println!("✓ Vendor rules from {}", rules_path.display());
    }

    let fingerprint = store.snapshot()?.fingerprint()?;
    println!("\n✅ Mapping fingerprint {}", fingerprint);
    Ok(())
}

fn run_reset(config: &AppConfig) -> Result<()> {
    let mut ledger = open_ledger(config)?;

    println!("🧹 Resetting submission history");
    for step in ledger.reset()? {
        println!("✓ {}", step);
    }

    let snapshot = open_store(config)?.snapshot()?;
    for summary in regenerate_previews(&config.data_dir, &config.brands(), &snapshot)? {
        let state = ledger.sync_readiness(&summary)?;
        println!("✓ Regenerated preview for {} ({} rows, {})", summary.brand, summary.rows.len(), state);
    }
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_merge_needs_two_ids() {
        let cli = Cli::try_parse_from([
            "ledger-harmonize", "merge", "--ids", "V0001", "V0002", "--name", "Acme",
        ])
        .unwrap();
        match cli.command {
            Command::Merge { ids, name, address, .. } => {
                assert_eq!(ids, vec!["V0001", "V0002"]);
                assert_eq!(name, "Acme");
                assert_eq!(address, "");
            }
            other => panic!("expected merge, got {:?}", other),
        }

        assert!(Cli::try_parse_from(["ledger-harmonize", "merge", "--ids", "V0001", "--name", "Acme"]).is_err());
    }

    #[test]
    fn test_global_flags_and_subcommands() {
        let cli = Cli::try_parse_from([
            "ledger-harmonize", "--data-dir", "/srv/data", "--actor", "liam", "raw-vendors", "--brand", "TMH",
        ])
        .unwrap();
        assert_eq!(cli.data_dir, Some(PathBuf::from("/srv/data")));
        assert_eq!(cli.actor, "liam");
        assert!(matches!(cli.command, Command::RawVendors { brand: Some(ref b), output: None } if b == "TMH"));

        let cli = Cli::try_parse_from(["ledger-harmonize", "reset"]).unwrap();
        assert!(matches!(cli.command, Command::Reset));

        let cli = Cli::try_parse_from(["ledger-harmonize", "approve", "abc-123"]).unwrap();
        assert!(matches!(cli.command, Command::Approve { ref submission_id } if submission_id == "abc-123"));
    }

    #[test]
    fn test_reset_rebuilds_previews() {
        let dir = tempfile::tempdir().unwrap();
        let financial = dir.path().join("financial");
        fs::create_dir_all(&financial).unwrap();
        fs::write(
            financial.join("financial_raw_accounts.csv"),
            "brand,source_account_name,source_account_number,source_cost_center,amount\nTMH,Rent,6200,CC10,100\n",
        )
        .unwrap();

        let config = AppConfig::default().with_data_dir(dir.path().to_path_buf());
        run_reset(&config).unwrap();

        assert!(preview_path(dir.path(), "TMH").exists());
        assert!(preview_path(dir.path(), "Raymond").exists());
        assert!(config.ledger_path().exists());
    }
}
