use anyhow::Result;
use clap::{CommandFactory, Parser};
use patientor::calculators::{calculate_bmi, calculate_exercises, parse_number};
use patientor::config::{Cli, Commands, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // 解析命令行参数
    let cli = Cli::parse();

    // 加载配置
    let config = Config::load_with_cli(cli.clone())?;

    // 没有子命令时默认运行服务
    handle_command(cli.command.unwrap_or(Commands::Serve), config).await
}

async fn handle_command(command: Commands, config: Config) -> Result<()> {
    match command {
        Commands::Serve => {
            // 初始化日志系统，guard 必须存活到服务退出
            let _log_guard = config.init_logging()?;

            tracing::info!("Patientor Starting...");
            patientor::server::serve(config).await?;
        }
        Commands::Bmi { height, weight } => {
            let height = parse_number(&height)?;
            let weight = parse_number(&weight)?;
            println!("{}", calculate_bmi(height, weight)?);
        }
        Commands::Exercises { target, hours } => {
            let target = parse_number(&target)?;
            let hours = hours
                .iter()
                .map(|h| parse_number(h))
                .collect::<Result<Vec<_>, _>>()?;
            let result = calculate_exercises(&hours, target)?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Commands::PrintConfig => {
            print!("{}", config.to_toml()?);
        }
        Commands::ResetConfig => {
            // 重置配置
            let default_config = Config::default();
            if let Some(config_path) = Config::get_user_config_path() {
                default_config.save_to_file(&config_path)?;
                println!("配置已重置到: {}", config_path.display());
            } else {
                println!("无法确定配置文件路径");
            }
        }
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            let name = command.get_name().to_string();
            clap_complete::generate(shell, &mut command, name, &mut std::io::stdout());
        }
    }

    Ok(())
}
