use thiserror::Error;

/// 短语模板编译错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompileError {
    #[error("无法解析模板片段: \"{0}\"")]
    Unparseable(String),

    #[error("未知实体类型: {entity} (槽位 {slot})")]
    UnknownEntity { slot: String, entity: String },

    #[error("可选后缀展开结果数量非法 (\"{source_text}\": {count})")]
    IllegalAlternatives { source_text: String, count: usize },

    #[error("槽位名重复: {0}")]
    DuplicateSlot(String),

    #[error("候选组为空: \"{0}\"")]
    EmptyAlternatives(String),

    #[error("实体 {0} 没有任何有效词条")]
    EmptyEntity(String),
}

/// 词表格式错误
#[derive(Error, Debug)]
pub enum VocabularyError {
    #[error("第 {line_no} 行 [aliases] 格式非法，应为 proper = \"alias\": {line}")]
    IllegalFormat { line_no: usize, line: String },

    #[error("第 {line_no} 行出现在任何分节之前: {line}")]
    DataBeforeSection { line_no: usize, line: String },

    #[error("第 {line_no} 行未知分节: [{section}]")]
    UnknownSection { line_no: usize, section: String },

    #[error("第 {line_no} 行重复的别名: {proper} -> {alias}")]
    RedundantAlias {
        line_no: usize,
        proper: String,
        alias: String,
    },

    #[error("词表已初始化，重新加载前需先 clear()")]
    AlreadyInitialized,

    #[error("读取词表失败: {0}")]
    Io(#[from] std::io::Error),
}

/// 构建匹配引擎时的错误
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("词表错误: {0}")]
    Vocabulary(#[from] VocabularyError),

    #[error("意图 {intent} 编译失败: {source}")]
    Compile {
        intent: String,
        #[source]
        source: CompileError,
    },

    #[error("实体编译失败: {0}")]
    Entity(#[source] CompileError),
}
