/// 服务配置 - 账本完整性服务的所有配置项
///
/// # 环境变量
///
/// 所有配置项都可以通过环境变量覆盖：
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | WORK_DIR | /var/lib/ledger | 工作目录 |
/// | DATABASE_PATH | {WORK_DIR}/ledger.db | SQLite 数据库文件 |
/// | QUEUE_PATH | {WORK_DIR}/anchors.redb | 锚定队列持久化文件 |
/// | BLOB_DIR | {WORK_DIR}/blobs | 附件存储目录 |
/// | LOG_LEVEL | info | 日志级别 |
/// | LOG_DIR | (无) | 日志文件目录，不设置则只输出到终端 |
/// | ENVIRONMENT | development | 运行环境 |
///
/// # 示例
///
/// ```ignore
/// WORK_DIR=/data/ledger LOG_LEVEL=debug cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// 工作目录，存储数据库、队列、附件等文件
    pub work_dir: String,
    /// SQLite 数据库文件路径
    pub database_path: String,
    /// 锚定队列 (redb) 文件路径
    pub queue_path: String,
    /// 附件 blob 存储目录
    pub blob_dir: String,
    /// 日志级别: trace | debug | info | warn | error
    pub log_level: String,
    /// 日志文件目录 (可选)
    pub log_dir: Option<String>,
    /// 运行环境: development | staging | production
    pub environment: String,
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 如果环境变量未设置，使用默认值
    pub fn from_env() -> Self {
        let work_dir = std::env::var("WORK_DIR").unwrap_or_else(|_| "/var/lib/ledger".into());
        Self {
            database_path: std::env::var("DATABASE_PATH")
                .unwrap_or_else(|_| format!("{work_dir}/ledger.db")),
            queue_path: std::env::var("QUEUE_PATH")
                .unwrap_or_else(|_| format!("{work_dir}/anchors.redb")),
            blob_dir: std::env::var("BLOB_DIR").unwrap_or_else(|_| format!("{work_dir}/blobs")),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_dir: std::env::var("LOG_DIR").ok(),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
            work_dir,
        }
    }
}
