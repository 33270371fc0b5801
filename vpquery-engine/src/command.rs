use std::collections::HashMap;

use vpquery_core::document::{EntityHandle, EntityKind};

use crate::drawing::MemoryDrawing;
use crate::host::SelectionFilter;
use crate::query::{QueryOutcome, QuerySource, SpatialQueryCoordinator};

#[derive(Debug, Clone)]
pub struct CommandRequest {
    pub name: String,
    pub args: Vec<String>,
}

impl CommandRequest {
    pub fn new<I, S>(name: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CommandResponse {
    pub success: bool,
    pub message: Option<String>,
    pub handles: Vec<EntityHandle>,
}

impl CommandResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            handles: Vec::new(),
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            handles: Vec::new(),
        }
    }

    fn with_handles(mut self, handles: Vec<EntityHandle>) -> Self {
        self.handles = handles;
        self
    }
}

pub trait CommandHandler: Send + Sync {
    fn name(&self) -> &'static str;
    fn execute(
        &self,
        request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse;
}

pub struct CommandContext<'a> {
    pub drawing: &'a mut MemoryDrawing,
    pub coordinator: &'a SpatialQueryCoordinator,
    pub filter: Option<&'a dyn SelectionFilter>,
    /// 未给出容差参数时使用。
    pub default_tolerance: f64,
}

pub struct CommandBus {
    handlers: HashMap<&'static str, Box<dyn CommandHandler>>,
}

impl Default for CommandBus {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandBus {
    pub fn new() -> Self {
        let mut bus = Self {
            handlers: HashMap::new(),
        };
        bus.register(ListViewportsCommand);
        bus.register(QueryCommand {
            name: "query_viewport",
            source: QuerySource::Viewport,
        });
        bus.register(QueryCommand {
            name: "query_block",
            source: QuerySource::Block,
        });
        bus
    }

    pub fn register<H: CommandHandler + 'static>(&mut self, handler: H) {
        self.handlers.insert(handler.name(), Box::new(handler));
    }

    pub fn dispatch(
        &self,
        request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        if let Some(handler) = self.handlers.get(request.name.as_str()) {
            handler.execute(request, context)
        } else {
            CommandResponse::err(format!("未知命令: {}", request.name))
        }
    }

    pub fn available_commands(&self) -> impl Iterator<Item = &&'static str> {
        self.handlers.keys()
    }
}

/// 解析十六进制句柄，允许 `0x` 前缀。
pub fn parse_handle(text: &str) -> Option<EntityHandle> {
    let text = text.trim();
    let digits = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text);
    u64::from_str_radix(digits, 16).ok().map(EntityHandle::new)
}

struct ListViewportsCommand;

impl CommandHandler for ListViewportsCommand {
    fn name(&self) -> &'static str {
        "list_viewports"
    }

    fn execute(
        &self,
        _request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        let handles: Vec<EntityHandle> = context
            .drawing
            .document()
            .viewports()
            .map(|(handle, _)| handle)
            .collect();
        CommandResponse::ok(format!("共 {} 个视口", handles.len())).with_handles(handles)
    }
}

struct QueryCommand {
    name: &'static str,
    source: fn(EntityHandle) -> QuerySource,
}

impl CommandHandler for QueryCommand {
    fn name(&self) -> &'static str {
        self.name
    }

    fn execute(
        &self,
        request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        let Some(raw_handle) = request.args.first() else {
            return CommandResponse::err(format!("用法: {} <句柄> [容差]", self.name));
        };
        let Some(handle) = parse_handle(raw_handle) else {
            return CommandResponse::err(format!("无效句柄: {raw_handle}"));
        };
        let tolerance = match request.args.get(1) {
            Some(raw) => match raw.parse::<f64>() {
                Ok(value) if value.is_finite() => value,
                _ => return CommandResponse::err(format!("无效容差: {raw}")),
            },
            None => context.default_tolerance,
        };

        let source = (self.source)(handle);
        match context
            .coordinator
            .query(&mut *context.drawing, source, context.filter, tolerance)
        {
            Ok(report) => {
                let message = match report.outcome {
                    QueryOutcome::Matched => format!("命中 {} 个实体", report.handles.len()),
                    QueryOutcome::DegenerateBoundary => "边界点不足，结果为空".to_string(),
                    QueryOutcome::MalformedViewport => "视口比例无效，结果为空".to_string(),
                    QueryOutcome::SelectionFailed(status) => {
                        format!("选择未成功 ({status:?})，结果为空")
                    }
                };
                CommandResponse::ok(message).with_handles(report.handles)
            }
            Err(err) => CommandResponse::err(format!("查询 {handle} 失败: {err}")),
        }
    }
}

/// 便于日志输出的实体类型摘要。
pub fn describe_handles(drawing: &MemoryDrawing, handles: &[EntityHandle]) -> Vec<String> {
    handles
        .iter()
        .map(|handle| {
            let kind = drawing
                .document()
                .entity(*handle)
                .map(|entity| entity.kind())
                .map_or("?", EntityKind::type_name);
            format!("{handle} {kind}")
        })
        .collect()
}
