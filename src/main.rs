use clap::Parser;
use sidecar_cutover::domain::model::{CutoverPlan, CutoverReport, OutcomeStatus};
use sidecar_cutover::utils::{logger, validation::Validate};
use sidecar_cutover::{
    AzureControlPlane, CliConfig, CutoverOrchestrator, LocalStorage, MigrationError, StaticTokenProvider,
};

#[tokio::main]
async fn main() {
    // Missing identifiers end here with usage and a non-zero exit code.
    let config = CliConfig::parse();

    if config.json_logs {
        logger::init_json_logger(config.verbose);
    } else {
        logger::init_cli_logger(config.verbose);
    }

    tracing::info!("Starting sidecar-cutover for {}", config.target());

    if let Err(e) = run(&config).await {
        tracing::error!(
            "❌ Cutover failed: {} (Kind: {}, Severity: {:?})",
            e,
            e.kind(),
            e.severity()
        );
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 Suggestion: {}", e.recovery_suggestion());

        // A dry run never creates the slot.
        if !config.dry_run {
            if let Some(notice) = e.step().and_then(|step| config.target().leftover_slot_notice(step)) {
                tracing::warn!("⚠️ {}", notice);
                eprintln!("⚠️ {}", notice);
            }
        }
        std::process::exit(e.severity().exit_code());
    }
}

async fn run(config: &CliConfig) -> Result<(), MigrationError> {
    config.validate()?;
    let settings = config.settings()?;
    if config.verbose {
        tracing::debug!("Resolved settings: {:?}", settings);
    }

    let credentials = StaticTokenProvider::new(config.access_token()?)?;

    let control_plane = AzureControlPlane::new(&settings, credentials)?;
    let storage = LocalStorage::new(settings.artifact.output_path.clone());
    let mut orchestrator = CutoverOrchestrator::new(control_plane, storage).with_settings(&settings);
    if let Some(run_id) = &config.run_id {
        orchestrator = orchestrator.with_run_id(run_id.clone());
    }

    let target = config.target();
    if config.dry_run {
        let plan = orchestrator.plan(&target).await?;
        if config.json {
            println!("{}", serde_json::to_string_pretty(&plan)?);
        } else {
            print_plan(&plan);
        }
        return Ok(());
    }

    let report = orchestrator.run(&target).await?;
    if config.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn print_plan(plan: &CutoverPlan) {
    println!("🔍 Dry run for {} (run {})", plan.target, plan.run_id);
    println!("📁 Decoded manifest saved to: {}", plan.artifact_path);
    for descriptor in plan.topology.descriptors() {
        println!(
            "   {} {} -> {}{}",
            if descriptor.is_primary { "★" } else { "•" },
            descriptor.name,
            descriptor.image,
            descriptor.port.map(|p| format!(" (port {})", p)).unwrap_or_default()
        );
    }
}

fn print_report(report: &CutoverReport) {
    println!("✅ Slot '{}' migrated to sidecar containers", report.target.environment_slot);
    println!("📁 Decoded manifest saved to: {}", report.artifact_path);
    for outcome in &report.apply.outcomes {
        match &outcome.status {
            OutcomeStatus::Applied { resource } => {
                println!("   ✅ {} -> {}", outcome.service, resource.image)
            }
            OutcomeStatus::Failed { kind, detail } => {
                println!("   ❌ {} [{}]: {}", outcome.service, kind, detail)
            }
        }
    }
    if report.apply.is_partial() {
        println!(
            "⚠️ {} of {} container(s) failed; validate the slot before promoting",
            report.apply.failed_count(),
            report.apply.outcomes.len()
        );
    }
    println!("🚦 Validate the slot, then promote it with:");
    println!("{}", report.promotion_command);
}
