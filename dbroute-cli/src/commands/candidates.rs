//! `dbroute candidates` command - List PostgreSQL connection candidates.

use dbroute_config::EnvReader;
use dbroute_postgres::{PostgresSettings, candidate, router};

use crate::cli::CandidatesArgs;
use crate::env;
use crate::error::CliResult;
use crate::output::{self, kv};

/// Run the candidates command
pub async fn run(args: CandidatesArgs) -> CliResult<()> {
    let source = env::load(&args.env)?;
    let settings = PostgresSettings::from_env(&EnvReader::new(&source));
    let project = router::derive_project(&settings);
    let candidates = candidate::plan(&settings, project.as_ref());

    output::header("Connection candidates");

    kv("Mode", settings.supabase.mode.name());
    match &project {
        Some(project) => {
            let source = format!("{:?}", project.source).to_lowercase();
            kv("Project ref", &format!("{} ({})", project.value, source));
        }
        None => kv("Project ref", "none"),
    }
    kv("Probe", if settings.supabase.enable_probe { "enabled" } else { "disabled" });
    output::newline();

    if candidates.is_empty() {
        output::warn("No candidates derivable; the static configuration will be used.");
        return Ok(());
    }

    for (i, c) in candidates.iter().enumerate() {
        output::numbered_item(
            i + 1,
            &format!("{:<12} {}:{}  {}", c.mode.name(), c.host, c.port, c.description),
        );
        if let Some(options) = c.param("options") {
            output::dim(&format!("       options={}", options));
        }
    }

    for warning in &settings.warnings {
        output::warn(warning);
    }

    Ok(())
}
