//! `dbroute resolve` command - Resolve and print the connection descriptor.

use dbroute::Resolver;
use dbroute_config::{
    Connection, ConnectionDescriptor, EnvReader, LookupStrategy, RoutingReport, Selection,
};
use tracing::debug;

use crate::cli::ResolveArgs;
use crate::env;
use crate::error::CliResult;
use crate::output::{self, kv};

/// Run the resolve command
pub async fn run(args: ResolveArgs) -> CliResult<()> {
    let mut source = env::load(&args.env)?;
    if EnvReader::new(&source).bool("LOG_DB_CONNECTION_DETAILS", false) {
        dbroute::logging::init_with_level("info");
    }
    if let Some(probe) = args.probe_override() {
        debug!(probe, "Probe setting overridden on the command line");
        source.insert("SUPABASE_ENABLE_PROBE", probe.to_string());
    }

    let resolved = Resolver::new(source).project_root(&args.root).resolve().await;
    let descriptor = if args.show_secrets {
        resolved
    } else {
        resolved.redacted()
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&descriptor)?);
        return Ok(());
    }

    print_summary(&descriptor);
    Ok(())
}

fn print_summary(descriptor: &ConnectionDescriptor) {
    output::header("Resolved connection");
    kv("Client", descriptor.client.name());

    match &descriptor.connection {
        Connection::File { filename } => kv("Filename", &filename.display().to_string()),
        Connection::Server(server) => {
            kv("Host", &server.host);
            kv("Port", &server.port.to_string());
            kv("Database", &server.database);
            kv("User", &server.user);
            if let Some(schema) = &server.schema {
                kv("Schema", schema);
            }
            kv("SSL", if server.ssl.is_enabled() { "enabled" } else { "disabled" });
            if let Some(options) = server.options() {
                kv("Options", options);
            }
            let lookup = match server.lookup {
                LookupStrategy::System => "system".to_string(),
                LookupStrategy::Ipv4(addr) => format!("ipv4 ({})", addr),
            };
            kv("Lookup", &lookup);
            if let Some(url) = &server.connection_string {
                kv("URL", url);
            }
        }
    }

    if let Some(routing) = &descriptor.routing {
        output::newline();
        print_routing(routing);
    }
}

fn print_routing(routing: &RoutingReport) {
    output::section("Routing");
    kv("Mode", routing.mode.name());
    let selection = match routing.selection {
        Selection::Static => "static configuration".to_string(),
        Selection::Candidate(mode) => format!("{} candidate", mode),
    };
    kv("Selected", &selection);
    if let Some(project_ref) = &routing.project_ref {
        kv("Project ref", project_ref);
    }
    if routing.pooler_corrected {
        output::info("Pooler host was rewritten to the direct host");
    }

    if !routing.attempts.is_empty() {
        output::newline();
        output::section("Probe attempts");
        for (i, attempt) in routing.attempts.iter().enumerate() {
            let status = if attempt.success {
                output::style_success("ok")
            } else {
                output::style_error("failed")
            };
            let mut line = format!(
                "{} {}:{} {} ({} ms)",
                attempt.mode,
                attempt.host,
                attempt.port,
                status,
                attempt.duration.as_millis()
            );
            if let Some(error) = &attempt.error {
                line.push_str(&format!(" - {:?}: {}", error.kind, error.message));
            }
            output::numbered_item(i + 1, &line);
        }
    }

    for warning in &routing.warnings {
        output::warn(warning);
    }

    if routing.warnings.is_empty() {
        output::newline();
        output::success("Resolution completed without warnings");
    }
}
