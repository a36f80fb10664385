use clap::{Parser, Subcommand};
use qubes_aux_core::{AdminConfig, BoxError, PolicyAdmin, PolicyScope, PolicyToken};
use serde::Serialize;
use std::error::Error;
use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "qubes-policy", version, about = "Read and write qrexec policies")]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Policy directory, overriding the configuration
    #[arg(long, global = true)]
    policy_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print a policy; its token goes to stderr
    Get {
        /// Policy name, `NAME` or `include/NAME`
        name: String,
        /// Print name, scope, content and token as JSON
        #[arg(long)]
        json: bool,
    },
    /// List policy names
    List {
        /// List include fragments instead of regular policies
        #[arg(long)]
        include: bool,
    },
    /// Remove a policy
    Remove { name: String },
    /// Replace a policy if TOKEN still matches (`new` to create, `any` to force)
    Replace {
        name: String,
        #[arg(long)]
        token: String,
        /// Read content from FILE instead of stdin
        #[arg(long)]
        file: Option<PathBuf>,
        /// Skip linting the new content first
        #[arg(long)]
        no_lint: bool,
    },
    /// Lint policy content without writing it
    Lint {
        name: String,
        #[arg(long)]
        file: Option<PathBuf>,
    },
}

#[derive(Debug, Serialize)]
struct PolicyDocument<'a> {
    name: &'a str,
    scope: PolicyScope,
    content: &'a str,
    token: &'a PolicyToken,
}

fn main() {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprint!("{}", error_report(&*e));
            std::process::exit(1);
        }
    };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let admin = PolicyAdmin::from_config(&config);
    let stdout = io::stdout();
    if let Err(e) = run(&admin, cli.command, &mut stdout.lock()) {
        eprint!("{}", error_report(&*e));
        std::process::exit(1);
    }
}

/// `Error: ...` followed by one `caused by:` line per source.
fn error_report(err: &(dyn Error + 'static)) -> String {
    let mut report = format!("Error: {}\n", err);
    let mut source = err.source();
    while let Some(cause) = source {
        report.push_str(&format!("  caused by: {}\n", cause));
        source = cause.source();
    }
    report
}

fn load_config(cli: &Cli) -> Result<AdminConfig, BoxError> {
    let mut config = AdminConfig::load_or_default(cli.config.as_deref())?;
    if let Some(dir) = &cli.policy_dir {
        config.policy_dir = dir.clone();
        config.validate()?;
    }
    Ok(config)
}

fn read_content(file: Option<&PathBuf>) -> io::Result<String> {
    match file {
        Some(path) => fs::read_to_string(path),
        None => {
            let mut content = String::new();
            io::stdin().read_to_string(&mut content)?;
            Ok(content)
        }
    }
}

fn run(admin: &PolicyAdmin, command: Commands, out: &mut dyn Write) -> Result<(), BoxError> {
    match command {
        Commands::Get { name, json } => {
            let handle = admin.open(&name)?;
            let (content, token) = handle.get()?;
            if json {
                let document = PolicyDocument {
                    name: handle.name().as_str(),
                    scope: handle.scope(),
                    content: &content,
                    token: &token,
                };
                writeln!(out, "{}", serde_json::to_string_pretty(&document)?)?;
            } else {
                write!(out, "{}", content)?;
                eprintln!("token: {}", token);
            }
        }
        Commands::List { include } => {
            let scope = if include {
                PolicyScope::Include
            } else {
                PolicyScope::Regular
            };
            for name in admin.list(scope)? {
                writeln!(out, "{}", name)?;
            }
        }
        Commands::Remove { name } => {
            admin.open(&name)?.remove()?;
            info!("Removed policy {}", name);
        }
        Commands::Replace {
            name,
            token,
            file,
            no_lint,
        } => {
            let handle = admin.open(&name)?;
            let content = read_content(file.as_ref())?;
            if no_lint {
                debug!("Skipping lint for {}", name);
            } else {
                handle.lint(&content)?;
            }
            handle.replace(&content, &PolicyToken::from(token))?;
            info!("Replaced policy {}", name);
        }
        Commands::Lint { name, file } => {
            let handle = admin.open(&name)?;
            let content = read_content(file.as_ref())?;
            handle.lint(&content)?;
            writeln!(out, "{}: OK", name)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use qubes_aux_core::{FilePolicyStore, PolicyError};
    use std::sync::Arc;
    use tempfile::tempdir;

    const RULES: &str = "qubes.Filecopy * work @anyvm ask\n";

    fn admin(dir: &std::path::Path) -> PolicyAdmin {
        PolicyAdmin::new(Arc::new(FilePolicyStore::new(dir)))
    }

    fn run_to_string(admin: &PolicyAdmin, args: &[&str]) -> Result<String, BoxError> {
        let cli = Cli::try_parse_from(std::iter::once("qubes-policy").chain(args.iter().copied()))?;
        let mut out = Vec::new();
        run(admin, cli.command, &mut out)?;
        Ok(String::from_utf8(out)?)
    }

    #[test]
    fn test_replace_get_list_remove() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("30-user.txt");
        fs::write(&source, RULES).unwrap();
        let policy_dir = dir.path().join("policy.d");
        let admin = admin(&policy_dir);

        run_to_string(
            &admin,
            &[
                "replace",
                "30-user",
                "--token",
                "new",
                "--no-lint",
                "--file",
                source.to_str().unwrap(),
            ],
        )
        .unwrap();

        assert_eq!(run_to_string(&admin, &["get", "30-user"]).unwrap(), RULES);
        assert_eq!(run_to_string(&admin, &["list"]).unwrap(), "30-user\n");
        assert_eq!(run_to_string(&admin, &["list", "--include"]).unwrap(), "");

        let json = run_to_string(&admin, &["get", "30-user", "--json"]).unwrap();
        let document: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(document["scope"], "regular");
        assert_eq!(document["content"], RULES);
        assert!(document["token"].as_str().unwrap().starts_with("sha256:"));

        run_to_string(&admin, &["remove", "30-user"]).unwrap();
        assert_eq!(run_to_string(&admin, &["list"]).unwrap(), "");
    }

    #[test]
    fn test_bad_name_is_reported() {
        let dir = tempdir().unwrap();
        let admin = admin(dir.path());
        let err = run_to_string(&admin, &["get", "subdir/30-user"]).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PolicyError>(),
            Some(PolicyError::ParentValidation { .. })
        ));
    }

    #[test]
    fn test_error_report_lists_causes_once() {
        let dir = tempdir().unwrap();
        let admin = admin(dir.path());
        let err = run_to_string(&admin, &["remove", "include/missing"]).unwrap_err();
        assert_eq!(
            error_report(&*err),
            "Error: Error during client method 'remove'\n  caused by: Policy not found: missing\n"
        );
    }

    #[test]
    fn test_replace_requires_token() {
        assert!(Cli::try_parse_from(["qubes-policy", "replace", "30-user"]).is_err());
        let cli = Cli::try_parse_from([
            "qubes-policy",
            "--policy-dir",
            "/srv/policy.d",
            "lint",
            "include/admin",
        ])
        .unwrap();
        assert_eq!(cli.policy_dir, Some(PathBuf::from("/srv/policy.d")));
        assert!(matches!(cli.command, Commands::Lint { ref name, .. } if name == "include/admin"));
    }

    #[test]
    fn test_policy_dir_override_is_validated() {
        let cli =
            Cli::try_parse_from(["qubes-policy", "--policy-dir", "relative", "list"]).unwrap();
        assert!(load_config(&cli).is_err());
    }
}
