// ==========================================
// 麻醉科排班系统 - 命令行入口
// ==========================================
// 用法:
//   bloc-planning <request.json> [--db <db_path>]
//
// 读取 GenerationRequest JSON，运行排班生成，向 stdout 输出 GenerationResult JSON。
// 指定 --db 时从该库的 config_kv 读取配置，否则使用默认配置。
// BLOC_LOG_FORMAT=json 时日志以 JSON 行输出到 stderr。
// ==========================================

use anyhow::{bail, Context};
use bloc_planning::config::{ConfigManager, DefaultPlanningConfig, PlanningConfigReader};
use bloc_planning::domain::GenerationRequest;
use bloc_planning::engine::PlanningGenerator;
use bloc_planning::{logging, APP_NAME, VERSION};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    match std::env::var("BLOC_LOG_FORMAT").as_deref() {
        Ok("json") => logging::init_json(),
        _ => logging::init(),
    }

    let mut request_path: Option<String> = None;
    let mut db_path: Option<String> = None;
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--db" => db_path = Some(args.next().context("--db 需要数据库路径")?),
            "-h" | "--help" => {
                eprintln!("{} v{}", APP_NAME, VERSION);
                eprintln!("用法: bloc-planning <request.json> [--db <db_path>]");
                return Ok(());
            }
            _ if request_path.is_none() => request_path = Some(arg),
            other => bail!("无法识别的参数: {}", other),
        }
    }
    let Some(request_path) = request_path else {
        bail!("缺少请求文件。用法: bloc-planning <request.json> [--db <db_path>]");
    };

    tracing::info!(version = VERSION, request = %request_path, "{}", APP_NAME);

    let raw = tokio::fs::read_to_string(&request_path)
        .await
        .with_context(|| format!("读取请求文件失败: {}", request_path))?;
    let request: GenerationRequest =
        serde_json::from_str(&raw).context("请求文件不是有效的 GenerationRequest")?;

    let settings = match &db_path {
        Some(path) => {
            let manager = ConfigManager::new(path).map_err(|e| anyhow::anyhow!("{}", e))?;
            manager.load_settings().await.map_err(|e| anyhow::anyhow!("{}", e))?
        }
        None => DefaultPlanningConfig
            .load_settings()
            .await
            .map_err(|e| anyhow::anyhow!("{}", e))?,
    };

    let generator = PlanningGenerator::new(settings);
    let result = tokio::task::spawn_blocking(move || generator.generate(&request))
        .await
        .context("生成任务异常终止")??;

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
