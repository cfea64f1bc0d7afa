// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod runtime;

use anyhow::{Context, Result, anyhow, bail};
use config::Config;
use csvview_app::UploadForm;
use csvview_client::Client;
use csvview_store::Store;
use runtime::{DemoRuntime, ServiceRuntime};
use std::env;
use std::fs::OpenOptions;
use std::path::PathBuf;
use time::format_description::well_known::Rfc3339;

fn main() {
    if let Err(error) = run() {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = parse_cli_args(env::args().skip(1), Config::default_path()?)?;
    if options.show_help {
        print_help();
        return Ok(());
    }

    if options.print_config_path {
        println!("{}", options.config_path.display());
        return Ok(());
    }

    if options.print_example {
        print!("{}", Config::example_config(&options.config_path));
        return Ok(());
    }

    let config = Config::load(&options.config_path).with_context(|| {
        format!(
            "load config {}; run `csvview --print-example-config` to generate a v1 template",
            options.config_path.display()
        )
    })?;

    let db_path = if options.demo {
        PathBuf::from(":memory:")
    } else {
        config.db_path()?
    };
    if options.print_db_path {
        println!("{}", db_path.display());
        return Ok(());
    }

    init_logging(&config)?;

    let mut store = Store::open(&db_path).with_context(|| {
        format!(
            "open database {} -- if this path is wrong, set [storage].db_path or CSVVIEW_DB_PATH",
            db_path.display()
        )
    })?;
    store.bootstrap()?;
    store.set_max_upload_size(config.max_upload_size())?;
    if options.demo {
        runtime::seed_demo_upload(&store)?;
    }

    let client = Client::new(config.base_url(), config.timeout()?).with_context(|| {
        format!(
            "invalid [server] config in {}; fix base_url/timeout values",
            options.config_path.display()
        )
    })?;
    let plots_options = config.plots_options()?;
    if options.check_only {
        return Ok(());
    }

    if options.list {
        for upload in store.list_uploads()? {
            let uploaded_at = upload
                .uploaded_at
                .format(&Rfc3339)
                .context("format upload timestamp")?;
            println!(
                "{}  {}  {}  {}",
                upload.file_id, upload.file_name, upload.author, uploaded_at
            );
        }
        return Ok(());
    }

    if let Some(path) = options.upload {
        let upload = runtime::upload_file(
            &store,
            &client,
            &UploadForm {
                path: Some(path),
                author: options.author.unwrap_or_default(),
                description: options.description.unwrap_or_default(),
            },
        )?;
        println!("uploaded {} as {}", upload.file_name, upload.file_id);
        return Ok(());
    }

    log::info!("starting csvview against {}", client.base_url());
    if options.demo {
        let mut runtime = DemoRuntime::new(&store);
        csvview_tui::run_app(&mut runtime, plots_options)
    } else {
        let mut runtime = ServiceRuntime::new(&store, client);
        csvview_tui::run_app(&mut runtime, plots_options)
    }
}

fn init_logging(config: &Config) -> Result<()> {
    let path = config.log_file()?;
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| {
            format!(
                "open log file {} -- set [log].file to a writable path",
                path.display()
            )
        })?;

    let filter = env::var("CSVVIEW_LOG").unwrap_or_else(|_| config.log_level().to_owned());
    env_logger::Builder::new()
        .parse_filters(&filter)
        .target(env_logger::Target::Pipe(Box::new(file)))
        .try_init()
        .context("install logger")?;
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    print_config_path: bool,
    print_db_path: bool,
    demo: bool,
    print_example: bool,
    check_only: bool,
    list: bool,
    upload: Option<PathBuf>,
    author: Option<String>,
    description: Option<String>,
    show_help: bool,
}

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions {
        config_path: default_config_path,
        print_config_path: false,
        print_db_path: false,
        demo: false,
        print_example: false,
        check_only: false,
        list: false,
        upload: None,
        author: None,
        description: None,
        show_help: false,
    };

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_ref() {
            "--config" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--config requires a file path"))?;
                options.config_path = PathBuf::from(value.as_ref());
            }
            "--upload" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--upload requires a CSV file path"))?;
                options.upload = Some(PathBuf::from(value.as_ref()));
            }
            "--author" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--author requires a name"))?;
                options.author = Some(value.as_ref().to_owned());
            }
            "--description" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--description requires a value"))?;
                options.description = Some(value.as_ref().to_owned());
            }
            "--print-config-path" => {
                options.print_config_path = true;
            }
            "--print-path" => {
                options.print_db_path = true;
            }
            "--print-example-config" => {
                options.print_example = true;
            }
            "--demo" => {
                options.demo = true;
            }
            "--check" => {
                options.check_only = true;
            }
            "--list" => {
                options.list = true;
            }
            "--help" | "-h" => {
                options.show_help = true;
            }
            unknown => {
                bail!("unknown argument {unknown:?}; run with --help to see supported options");
            }
        }
    }

    if options.upload.is_none() && (options.author.is_some() || options.description.is_some()) {
        bail!("--author and --description only apply with --upload <path>");
    }
    if options.upload.is_some() && options.demo {
        bail!("--upload cannot be combined with --demo; the demo store is discarded on exit");
    }

    Ok(options)
}

fn print_help() {
    println!("csvview");
    println!("  --config <path>          Use a specific config path");
    println!("  --print-config-path      Print resolved config path");
    println!("  --print-path             Print resolved database path");
    println!("  --print-example-config   Print a v1 config template");
    println!("  --demo                   Launch with a generated demo upload (in-memory)");
    println!("  --check                  Validate config + DB + server settings");
    println!("  --upload <path>          Upload a CSV file to the service and record it");
    println!("  --author <name>          Author for --upload (default Unknown)");
    println!("  --description <text>     Description for --upload (default No Description)");
    println!("  --list                   Print recorded uploads");
    println!("  --help                   Show this help");
}

#[cfg(test)]
mod tests {
    use super::{CliOptions, parse_cli_args};
    use anyhow::Result;
    use std::path::PathBuf;

    fn default_options_path() -> PathBuf {
        PathBuf::from("/tmp/csvview-config.toml")
    }

    #[test]
    fn parse_cli_args_defaults_to_provided_config_path() -> Result<()> {
        let options = parse_cli_args(Vec::<String>::new(), default_options_path())?;
        assert_eq!(
            options,
            CliOptions {
                config_path: default_options_path(),
                print_config_path: false,
                print_db_path: false,
                demo: false,
                print_example: false,
                check_only: false,
                list: false,
                upload: None,
                author: None,
                description: None,
                show_help: false,
            }
        );
        Ok(())
    }

    #[test]
    fn parse_cli_args_sets_config_path_override() -> Result<()> {
        let options = parse_cli_args(
            vec!["--config", "/custom/config.toml"],
            default_options_path(),
        )?;
        assert_eq!(options.config_path, PathBuf::from("/custom/config.toml"));
        Ok(())
    }

    #[test]
    fn parse_cli_args_errors_for_missing_values() {
        let error = parse_cli_args(vec!["--config"], default_options_path())
            .expect_err("missing config value should fail");
        assert!(error.to_string().contains("--config requires a file path"));

        let error = parse_cli_args(vec!["--upload"], default_options_path())
            .expect_err("missing upload value should fail");
        assert!(error.to_string().contains("--upload requires a CSV file path"));
    }

    #[test]
    fn parse_cli_args_errors_for_unknown_argument() {
        let error = parse_cli_args(vec!["--wat"], default_options_path())
            .expect_err("unknown arg should fail");
        let message = error.to_string();
        assert!(message.contains("unknown argument"));
        assert!(message.contains("--help"));
    }

    #[test]
    fn parse_cli_args_collects_upload_fields() -> Result<()> {
        let options = parse_cli_args(
            vec![
                "--upload",
                "/data/sales.csv",
                "--author",
                "Ada",
                "--description",
                "Q1 numbers",
            ],
            default_options_path(),
        )?;
        assert_eq!(options.upload, Some(PathBuf::from("/data/sales.csv")));
        assert_eq!(options.author.as_deref(), Some("Ada"));
        assert_eq!(options.description.as_deref(), Some("Q1 numbers"));
        Ok(())
    }

    #[test]
    fn parse_cli_args_rejects_author_without_upload() {
        let error = parse_cli_args(vec!["--author", "Ada"], default_options_path())
            .expect_err("author alone should fail");
        assert!(error.to_string().contains("--upload"));

        let error = parse_cli_args(vec!["--description", "x"], default_options_path())
            .expect_err("description alone should fail");
        assert!(error.to_string().contains("--upload"));
    }

    #[test]
    fn parse_cli_args_rejects_upload_in_demo_mode() {
        let error = parse_cli_args(
            vec!["--demo", "--upload", "/data/sales.csv"],
            default_options_path(),
        )
        .expect_err("demo upload should fail");
        assert!(error.to_string().contains("--demo"));
    }

    #[test]
    fn parse_cli_args_sets_print_check_and_list_flags() -> Result<()> {
        let options = parse_cli_args(
            vec![
                "--print-config-path",
                "--print-example-config",
                "--check",
                "--list",
            ],
            default_options_path(),
        )?;
        assert!(options.print_config_path);
        assert!(!options.print_db_path);
        assert!(!options.demo);
        assert!(options.print_example);
        assert!(options.check_only);
        assert!(options.list);
        assert!(!options.show_help);
        Ok(())
    }

    #[test]
    fn parse_cli_args_sets_demo_and_db_path_print_flags() -> Result<()> {
        let options = parse_cli_args(vec!["--demo", "--print-path"], default_options_path())?;
        assert!(!options.print_config_path);
        assert!(options.print_db_path);
        assert!(options.demo);
        Ok(())
    }

    #[test]
    fn parse_cli_args_sets_help_flag_for_long_and_short_variants() -> Result<()> {
        let long = parse_cli_args(vec!["--help"], default_options_path())?;
        assert!(long.show_help);

        let short = parse_cli_args(vec!["-h"], default_options_path())?;
        assert!(short.show_help);
        Ok(())
    }
}
