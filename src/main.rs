use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use std::path::PathBuf;

mod client;
mod ui;

fn print_usage_and_exit() -> ! {
    println!(
        "Usage: prize-wheel [--music <file>] [--import <catalogue.json>] [--seed <n>]\n\
         [--fps <n>] [--log-dir <path>]\n\
         \n\
         Flags:\n\
           --music <file>      Audio file looped while a spin runs\n\
           --import <file>     Seed prizes and players from a JSON catalogue\n\
           --seed <n>          Seed the random generator for a reproducible session\n\
           --fps <n>           Animation frame rate, 1 to 120 (default {})\n\
           --log-dir <path>    Directory for the rolling log file (default {})",
        client::DEFAULT_FPS,
        client::DEFAULT_LOG_DIR,
    );
    std::process::exit(0);
}

fn expand_path(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).into_owned())
}

fn parse_cli_args(args: impl IntoIterator<Item = String>) -> Result<client::AppConfig> {
    let mut args = args.into_iter();
    let mut music: Option<String> = None;
    let mut import: Option<PathBuf> = None;
    let mut seed: Option<u64> = None;
    let mut fps: Option<u32> = None;
    let mut log_dir: Option<PathBuf> = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--music" => {
                let file = args
                    .next()
                    .ok_or_else(|| eyre!("--music requires a file argument"))?;
                if music.is_some() {
                    return Err(eyre!("--music may only be specified once"));
                }
                music = Some(file);
            }
            "--import" => {
                let file = args
                    .next()
                    .ok_or_else(|| eyre!("--import requires a file argument"))?;
                if import.is_some() {
                    return Err(eyre!("--import may only be specified once"));
                }
                import = Some(expand_path(&file));
            }
            "--seed" => {
                let raw = args
                    .next()
                    .ok_or_else(|| eyre!("--seed requires a number"))?;
                if seed.is_some() {
                    return Err(eyre!("--seed may only be specified once"));
                }
                let value = raw
                    .parse::<u64>()
                    .wrap_err_with(|| format!("--seed expects an unsigned integer, got {raw:?}"))?;
                seed = Some(value);
            }
            "--fps" => {
                let raw = args
                    .next()
                    .ok_or_else(|| eyre!("--fps requires a number"))?;
                if fps.is_some() {
                    return Err(eyre!("--fps may only be specified once"));
                }
                let value = raw
                    .parse::<u32>()
                    .wrap_err_with(|| format!("--fps expects an integer, got {raw:?}"))?;
                if !(1..=120).contains(&value) {
                    return Err(eyre!("--fps must be between 1 and 120, got {value}"));
                }
                fps = Some(value);
            }
            "--log-dir" => {
                let dir = args
                    .next()
                    .ok_or_else(|| eyre!("--log-dir requires a path argument"))?;
                if log_dir.is_some() {
                    return Err(eyre!("--log-dir may only be specified once"));
                }
                log_dir = Some(expand_path(&dir));
            }
            "--help" | "-h" => print_usage_and_exit(),
            other => return Err(eyre!("Unknown argument: {other}")),
        }
    }

    Ok(client::AppConfig {
        music,
        import,
        seed,
        fps: fps.unwrap_or(client::DEFAULT_FPS),
        log_dir: log_dir.unwrap_or_else(|| PathBuf::from(client::DEFAULT_LOG_DIR)),
    })
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let app_config = parse_cli_args(std::env::args().skip(1))?;
    let _log_guard = client::init_tracing(&app_config.log_dir)?;
    tracing::info!(?app_config, "starting prize-wheel");
    client::run_app(app_config).await
}
