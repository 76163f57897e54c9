use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// 对应 config.json 文件的结构体
/// 使用 serde 进行序列化和反序列化
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Config {
    /// CodeQL 相关配置
    pub codeql: CodeqlConfig,

    /// Maven 相关配置（仅 Java 项目需要）
    #[serde(default)]
    pub maven: MavenConfig,

    /// 工作区配置
    #[serde(default)]
    pub workspace: WorkspaceConfig,
}

/// CodeQL 扫描器本身的配置
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct CodeqlConfig {
    /// CodeQL 可执行文件路径
    #[serde(default)]
    pub path: String,

    /// 自定义规则库路径（可选）
    #[serde(default)]
    pub rules_path: String,

    /// 是否启用自定义规则库
    /// 启用且路径非空时，rules_path 会覆盖各语言的默认规则库
    #[serde(default)]
    pub rules_path_enabled: bool,

    /// 各语言（小写）对应的默认规则库路径
    /// 使用 BTreeMap 保证保存时字段顺序稳定
    #[serde(default)]
    pub queries: BTreeMap<String, String>,
}

/// Maven 配置
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct MavenConfig {
    /// Maven 可执行文件路径（可选）
    #[serde(default)]
    pub path: String,
}

/// 工作区配置
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct WorkspaceConfig {
    /// 临时工作目录，生成的数据库和报告都写到这里
    /// 加载后若为相对路径会被解析为绝对路径；为空时扫描器退回到项目目录
    #[serde(default)]
    pub temp_dir: String,
}

/// 支持的扫描语言（固定枚举）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    Java,
    Python,
    JavaScript,
    Go,
}

impl Language {
    pub const ALL: [Language; 4] = [
        Language::Java,
        Language::Python,
        Language::JavaScript,
        Language::Go,
    ];

    /// 传给 CodeQL --language 参数的小写名称
    pub fn codeql_name(&self) -> &'static str {
        match self {
            Language::Java => "java",
            Language::Python => "python",
            Language::JavaScript => "javascript",
            Language::Go => "go",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Language::Java => "Java",
            Language::Python => "Python",
            Language::JavaScript => "JavaScript",
            Language::Go => "Go",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for Language {
    type Err = String;

    /// 解析语言名称，不区分大小写
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "java" => Ok(Language::Java),
            "python" => Ok(Language::Python),
            "javascript" => Ok(Language::JavaScript),
            "go" => Ok(Language::Go),
            _ => Err(format!(
                "不支持的语言: {} (可选: Java, Python, JavaScript, Go)",
                s
            )),
        }
    }
}
