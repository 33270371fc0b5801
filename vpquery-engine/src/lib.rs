pub mod command;
pub mod drawing;
pub mod host;
pub mod query;
pub mod session;

pub mod errors {
    use thiserror::Error;
    use vpquery_core::document::EntityHandle;

    /// 宿主协作方调用失败。
    #[derive(Debug, Clone, PartialEq, Error)]
    pub enum HostError {
        #[error("entity {0} not found")]
        EntityNotFound(EntityHandle),
        #[error("entity {0} is not a viewport")]
        NotAViewport(EntityHandle),
        #[error("entity {0} is not a block reference")]
        NotABlock(EntityHandle),
        #[error("host rejected {operation}: {reason}")]
        Rejected {
            operation: &'static str,
            reason: String,
        },
    }

    /// 查询失败。视口比例非法、边界退化与选择无结果都不属于错误，而是空结果。
    #[derive(Debug, Clone, PartialEq, Error)]
    pub enum QueryError {
        /// 查询过程中宿主调用失败；编辑器状态已在返回前恢复。
        #[error("host call failed during query: {0}")]
        Host(#[from] HostError),
        /// 查询本身成功，但恢复活动空间或视图失败。
        #[error("failed to restore editor state: {0}")]
        Restore(#[source] HostError),
    }

    #[derive(Debug, Clone, PartialEq, Eq, Error)]
    pub enum FilterError {
        #[error("unknown entity type `{0}`")]
        UnknownEntityType(String),
    }
}
