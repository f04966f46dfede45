//! `saj`: invoke Lambda functions, read Parameter Store values and publish
//! CloudWatch metrics from the command line.
//!
//! ```sh
//! saj invoke my-function --payload '{"hello": "world"}' --log-tail
//! saj invoke my-function:live --payload file://event.json --mode async
//! saj params get /app/db/user /app/db/password --decrypt
//! saj params path /app/ --recursive --trim
//! saj metric put MyApp Requests 1 --unit Count --dimension stage=prod
//! saj template /etc/nginx/site.conf.j2 --var listen=8080 --message '# managed by saj'
//! saj run "./deploy.sh --fast" --env PATH=/usr/bin:/bin --timeout 300
//! ```
//!
//! Run with `RUST_LOG=debug` to see what sajkit does under the hood.

use std::{collections::HashMap, path::PathBuf, time::Duration};

use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::Colorize;
use saj::{
    aws::Aws,
    invoke::InvocationResponse,
    metrics::{Dimension, MetricDatum},
    params::ParameterMap,
    payload::{FsReader, InvocationArgs, InvocationMode, Payload},
    process::RunConfig,
    template::WriteOptions,
};

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Parser)]
#[command(name = "saj", version, about = "Small AWS helpers")]
struct Cli {
    /// AWS region. Falls back to the default provider chain, then us-east-1.
    #[arg(long, env = "SAJ_REGION", global = true)]
    region: Option<String>,

    /// Custom endpoint for every AWS client, eg a local emulator.
    #[arg(long, env = "SAJ_ENDPOINT_URL", global = true)]
    endpoint_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Invoke a Lambda function.
    Invoke {
        /// Function name, name:qualifier or ARN.
        target: String,
        /// `sync`, `async`, `dry-run`, or a raw invocation type.
        #[arg(long)]
        mode: Option<String>,
        /// Text payload. Prefix with file:// to send the JSON in a file.
        #[arg(long)]
        payload: Option<String>,
        /// Print the tail of the execution log.
        #[arg(long)]
        log_tail: bool,
        /// Client context, Base64 encoded before sending.
        #[arg(long)]
        context: Option<String>,
        /// Version or alias to invoke.
        #[arg(long)]
        qualifier: Option<String>,
    },
    /// Read Parameter Store values.
    Params {
        #[command(subcommand)]
        command: ParamsCommand,
    },
    /// Publish CloudWatch metrics.
    Metric {
        #[command(subcommand)]
        command: MetricCommand,
    },
    /// Render a Jinja template to a file.
    Template {
        template: PathBuf,
        /// Defaults to the template path without its .j2 extension.
        #[arg(long)]
        dest: Option<PathBuf>,
        /// A `name=value` template variable. May be repeated.
        #[arg(long = "var", value_parser = parse_pair)]
        vars: Vec<(String, String)>,
        /// Render undefined variables as empty instead of failing.
        #[arg(long)]
        lenient: bool,
        /// Overwrite the destination without backing it up.
        #[arg(long)]
        no_backup: bool,
        /// A line written above the rendered content.
        #[arg(long)]
        message: Option<String>,
    },
    /// Run a command or script without a shell and exit with its code.
    Run {
        /// The command line, split with shell quoting rules.
        command: String,
        /// Treat the command as the path of a script to execute.
        #[arg(long)]
        script: bool,
        /// A `name=value` environment variable. The child inherits nothing
        /// else. May be repeated.
        #[arg(long = "env", value_parser = parse_pair)]
        env: Vec<(String, String)>,
        /// Kill the child after this many seconds.
        #[arg(long)]
        timeout: Option<u64>,
    },
}

#[derive(Subcommand)]
enum ParamsCommand {
    /// Look up parameters by name. Fails if any name is unknown.
    Get {
        #[arg(required = true)]
        names: Vec<String>,
        #[arg(long)]
        decrypt: bool,
        /// Only keep the last path segment of each name.
        #[arg(long)]
        trim: bool,
    },
    /// Look up every parameter under a path.
    Path {
        path: String,
        #[arg(long)]
        recursive: bool,
        #[arg(long)]
        decrypt: bool,
        /// Only keep the last path segment of each name.
        #[arg(long)]
        trim: bool,
    },
}

#[derive(Subcommand)]
enum MetricCommand {
    /// Publish a single data point, stamped with the current time.
    Put {
        namespace: String,
        name: String,
        value: f64,
        #[arg(long, default_value = "Count")]
        unit: String,
        /// A `name=value` dimension. May be repeated.
        #[arg(long = "dimension", value_parser = parse_dimension)]
        dimensions: Vec<Dimension>,
    },
}

fn parse_pair(s: &str) -> Result<(String, String), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got '{s}'"))?;
    Ok((name.to_owned(), value.to_owned()))
}

fn parse_dimension(s: &str) -> Result<Dimension, String> {
    let (name, value) = parse_pair(s)?;
    Ok(Dimension::new(name, value))
}

fn parse_mode(mode: &str) -> InvocationMode {
    match mode {
        "sync" => InvocationMode::Synchronous,
        "async" => InvocationMode::Asynchronous,
        "dry-run" => InvocationMode::DryRun,
        raw => InvocationMode::from(raw),
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

fn print_params(params: &ParameterMap, trim: bool) -> anyhow::Result<()> {
    let params = if trim {
        saj::params::trim_keys(params)
    } else {
        params.clone()
    };
    println!("{}", serde_json::to_string_pretty(&params)?);
    Ok(())
}

fn print_response(response: &InvocationResponse) -> anyhow::Result<()> {
    let status = format!("status {}", response.status_code);
    match &response.function_error {
        Some(err) => println!("{} ({})", status.red(), err.red()),
        None => println!("{}", status.green()),
    }
    if let Some(version) = &response.executed_version {
        println!("executed version {version}");
    }
    if let Some(tail) = response.log_tail()? {
        println!("{}", "--- log tail ---".dimmed());
        println!("{tail}");
        println!("{}", "----------------".dimmed());
    }
    if let Some(payload) = &response.payload {
        println!("{}", String::from_utf8_lossy(payload));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let aws = Aws::load(cli.region.as_deref(), cli.endpoint_url.as_deref()).await;

    match cli.command {
        Command::Invoke {
            target,
            mode,
            payload,
            log_tail,
            context,
            qualifier,
        } => {
            let args = InvocationArgs {
                target: target.clone(),
                mode: mode.as_deref().map(parse_mode),
                payload: payload.map(Payload::from_text),
                capture_log_tail: log_tail,
                caller_context: context,
                version: qualifier,
            };
            let response = saj::invoke::invoke(&aws.lambda(), &FsReader::default(), args)
                .await
                .with_context(|| format!("could not invoke '{target}'"))?;
            print_response(&response)?;
        }
        Command::Params { command } => match command {
            ParamsCommand::Get {
                names,
                decrypt,
                trim,
            } => {
                let params = saj::params::collect_flat(&aws.ssm(), &names, decrypt)
                    .await
                    .context("could not look up parameters")?;
                print_params(&params, trim)?;
            }
            ParamsCommand::Path {
                path,
                recursive,
                decrypt,
                trim,
            } => {
                let params = saj::params::collect_by_path(&aws.ssm(), &path, recursive, decrypt)
                    .await
                    .with_context(|| format!("could not look up parameters under '{path}'"))?;
                print_params(&params, trim)?;
            }
        },
        Command::Metric { command } => match command {
            MetricCommand::Put {
                namespace,
                name,
                value,
                unit,
                dimensions,
            } => {
                let datum = MetricDatum::new(name, value, unit, dimensions);
                saj::metrics::put_metric(&aws.cloudwatch(), &namespace, &[datum])
                    .await
                    .with_context(|| format!("could not publish to '{namespace}'"))?;
                log::info!("published metric to '{namespace}'");
                println!("{}", "ok".green());
            }
        },
        Command::Template {
            template,
            dest,
            vars,
            lenient,
            no_backup,
            message,
        } => {
            let vars: HashMap<String, String> = vars.into_iter().collect();
            let options = WriteOptions {
                destination: dest,
                fail_on_undefined: !lenient,
                backup_original: !no_backup,
                modification_message: message,
            };
            let written = saj::template::write_template_file(&template, &vars, &options)
                .with_context(|| format!("could not render '{}'", template.display()))?;
            println!("{} {}", "wrote".green(), written.display());
        }
        Command::Run {
            command,
            script,
            env,
            timeout,
        } => {
            let config = RunConfig {
                environment: env.into_iter().collect(),
                timeout: timeout.map(Duration::from_secs),
                work_dir: None,
            };
            let code = if script {
                saj::process::run_script(&command, &config).await
            } else {
                saj::process::run_command(&command, &config).await
            }
            .with_context(|| format!("could not run '{command}'"))?;
            if code != 0 {
                log::warn!("'{command}' exited with {code}");
                std::process::exit(code);
            }
        }
    }
    Ok(())
}
