use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};
use vpquery_config::AppConfig;
use vpquery_engine::command::{
    CommandBus, CommandContext, CommandRequest, CommandResponse, describe_handles,
};
use vpquery_engine::drawing::MemoryDrawing;
use vpquery_engine::errors::FilterError;
use vpquery_engine::host::{KindFilter, SelectionFilter};
use vpquery_engine::query::SpatialQueryCoordinator;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Filter(#[from] FilterError),
    #[error("命令 {command} 执行失败: {message}")]
    Command { command: String, message: String },
    #[error("序列化 JSON 失败: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone)]
pub enum QueryTarget {
    Viewport(String),
    Block(String),
}

#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    /// 覆盖配置中的默认容差。
    pub tolerance: Option<f64>,
    /// 非空时覆盖配置中的实体类型过滤。
    pub kinds: Vec<String>,
    pub json: bool,
    /// 为空时查询演示图纸中的全部视口与桌子块。
    pub target: Option<QueryTarget>,
}

#[derive(Debug, Serialize)]
struct CliReport {
    tolerance: f64,
    kinds: Vec<String>,
    results: Vec<CliQueryResult>,
}

#[derive(Debug, Serialize)]
struct CliQueryResult {
    command: String,
    target: String,
    message: String,
    handles: Vec<String>,
    entities: Vec<String>,
}

/// 在内置演示图纸上执行范围查询并打印结果。
pub fn run(config: &AppConfig, options: &QueryOptions) -> Result<(), CliError> {
    let mut drawing = MemoryDrawing::new();
    let demo = drawing.populate_demo();

    let coordinator =
        SpatialQueryCoordinator::with_tolerance_epsilon(config.query.effective_epsilon());
    let tolerance = options
        .tolerance
        .unwrap_or_else(|| config.query.effective_default_tolerance());
    let kinds = if options.kinds.is_empty() {
        config.query.entity_kinds.clone()
    } else {
        options.kinds.clone()
    };
    let kind_filter = if kinds.is_empty() {
        None
    } else {
        Some(KindFilter::from_type_names(&kinds)?)
    };
    let filter: Option<&dyn SelectionFilter> = kind_filter
        .as_ref()
        .map(|filter| filter as &dyn SelectionFilter);
    info!(tolerance, kinds = ?kinds, "范围查询参数");

    let bus = CommandBus::new();
    let mut context = CommandContext {
        drawing: &mut drawing,
        coordinator: &coordinator,
        filter,
        default_tolerance: tolerance,
    };

    let requests = match &options.target {
        Some(QueryTarget::Viewport(handle)) => {
            vec![CommandRequest::new("query_viewport", [handle.clone()])]
        }
        Some(QueryTarget::Block(handle)) => {
            vec![CommandRequest::new("query_block", [handle.clone()])]
        }
        None => {
            let listed = dispatch_cli_command(
                &bus,
                CommandRequest::new("list_viewports", Vec::<String>::new()),
                &mut context,
            )?;
            let mut requests: Vec<CommandRequest> = listed
                .handles
                .iter()
                .map(|handle| CommandRequest::new("query_viewport", [handle.to_string()]))
                .collect();
            requests.push(CommandRequest::new("query_block", [demo.desk.to_string()]));
            requests
        }
    };

    let mut results = Vec::with_capacity(requests.len());
    for request in requests {
        let target = request.args.first().cloned().unwrap_or_default();
        let response = dispatch_cli_command(&bus, request.clone(), &mut context)?;
        results.push(CliQueryResult {
            command: request.name,
            target,
            message: response.message.unwrap_or_default(),
            entities: describe_handles(&*context.drawing, &response.handles),
            handles: response.handles.iter().map(ToString::to_string).collect(),
        });
    }

    let report = CliReport {
        tolerance,
        kinds,
        results,
    };
    if options.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_text_report(&bus, &report);
    }
    Ok(())
}

fn dispatch_cli_command(
    bus: &CommandBus,
    request: CommandRequest,
    context: &mut CommandContext<'_>,
) -> Result<CommandResponse, CliError> {
    let response = bus.dispatch(&request, context);
    debug!(command = %request.name, success = response.success, "已执行命令");
    if response.success {
        Ok(response)
    } else {
        Err(CliError::Command {
            command: request.name,
            message: response
                .message
                .unwrap_or_else(|| "未知错误".to_string()),
        })
    }
}

fn print_text_report(bus: &CommandBus, report: &CliReport) {
    let mut commands: Vec<&str> = bus.available_commands().copied().collect();
    commands.sort_unstable();
    println!("vpquery 范围查询演示");
    println!("支持的命令: {}", commands.join(", "));
    if report.kinds.is_empty() {
        println!("容差={:.3}, 类型过滤=无", report.tolerance);
    } else {
        println!(
            "容差={:.3}, 类型过滤={}",
            report.tolerance,
            report.kinds.join(", ")
        );
    }

    for result in &report.results {
        println!("[{} {}] {}", result.command, result.target, result.message);
        for entity in &result.entities {
            println!("  - {entity}");
        }
    }
}
