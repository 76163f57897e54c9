use crate::model::{Config, Language};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;
use tracing::{debug, info};

/// 扫描流程中可能出现的错误
/// 外部工具退出码非零时，合并后的输出会原样带在错误信息里
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("启动 {program} 失败: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("创建数据库失败:\n{output}")]
    CreateDatabase { output: String },

    #[error("分析失败:\n{output}")]
    Analyze { output: String },

    #[error("读取结果文件失败: {0}")]
    ReadReport(#[from] std::io::Error),
}

/// 外部进程的执行结果
#[derive(Debug, Clone)]
pub struct ExecOutput {
    /// 进程是否以退出码 0 结束
    pub success: bool,
    /// stdout 和 stderr 合并后的文本
    pub output: String,
}

/// 外部进程执行接口
/// 扫描逻辑只通过这个接口调用外部工具，测试时可以换成假的实现，
/// 不需要真正的 CodeQL 可执行文件
pub trait CommandRunner {
    fn run(
        &self,
        program: &str,
        args: &[String],
        envs: &[(String, String)],
    ) -> Result<ExecOutput, ScanError>;
}

/// 真实的进程执行器，阻塞等待子进程退出
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(
        &self,
        program: &str,
        args: &[String],
        envs: &[(String, String)],
    ) -> Result<ExecOutput, ScanError> {
        let mut cmd = Command::new(program);
        cmd.args(args);
        for (key, value) in envs {
            cmd.env(key, value);
        }

        debug!("执行命令: {} {}", program, args.join(" "));
        let output = cmd.output().map_err(|e| ScanError::Spawn {
            program: program.to_string(),
            source: e,
        })?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        Ok(ExecOutput {
            success: output.status.success(),
            output: combined,
        })
    }
}

/// 使用配置的临时目录，未配置时退回到项目目录
fn effective_temp_dir<'a>(config: &'a Config, project_dir: &'a Path) -> &'a Path {
    if config.workspace.temp_dir.is_empty() {
        project_dir
    } else {
        Path::new(&config.workspace.temp_dir)
    }
}

/// 取项目目录的最后一段作为项目名
fn project_name(project_dir: &Path) -> String {
    project_dir
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Java 项目需要把 Maven 暴露给 CodeQL：
/// 设置 MAVEN_HOME，并把 Maven 可执行文件所在目录加到 PATH 最前面。
///
/// 注意：MAVEN_HOME 取配置路径向上两级目录，即假设 Maven 可执行文件
/// 位于 <maven_home>/bin/mvn 这样的结构下；配置的路径不满足该结构时
/// 推导出的 MAVEN_HOME 可能不正确。
fn build_java_env(config: &Config, language: Language) -> Vec<(String, String)> {
    let mut envs = Vec::new();
    if language != Language::Java || config.maven.path.is_empty() {
        return envs;
    }

    let maven_path = Path::new(&config.maven.path);
    let bin_dir = match maven_path.parent() {
        Some(dir) => dir,
        None => return envs,
    };

    if let Some(maven_home) = bin_dir.parent() {
        envs.push((
            "MAVEN_HOME".to_string(),
            maven_home.to_string_lossy().into_owned(),
        ));
    }

    // 用平台的路径分隔符把 bin 目录拼到现有 PATH 前面
    let current = std::env::var_os("PATH").unwrap_or_default();
    let paths = std::iter::once(bin_dir.to_path_buf()).chain(std::env::split_paths(&current));
    if let Ok(joined) = std::env::join_paths(paths) {
        envs.push(("PATH".to_string(), joined.to_string_lossy().into_owned()));
    }

    envs
}

/// 选择规则库：启用自定义规则库且路径非空时优先使用，
/// 否则取该语言配置的默认规则库
fn ruleset_path(config: &Config, language: Language) -> String {
    if config.codeql.rules_path_enabled && !config.codeql.rules_path.is_empty() {
        return config.codeql.rules_path.clone();
    }
    config
        .codeql
        .queries
        .get(language.codeql_name())
        .cloned()
        .unwrap_or_default()
}

/// 创建 CodeQL 数据库
///
/// 数据库路径为 <临时目录>/<项目名>-codeql_db。
/// 外部工具退出码非零时返回 CreateDatabase 错误，带上合并后的输出。
pub fn create_database(
    config: &Config,
    runner: &dyn CommandRunner,
    project_dir: &Path,
    language: Language,
) -> Result<PathBuf, ScanError> {
    let temp_dir = effective_temp_dir(config, project_dir);
    let db_path = temp_dir.join(format!("{}-codeql_db", project_name(project_dir)));

    let args = vec![
        "database".to_string(),
        "create".to_string(),
        db_path.to_string_lossy().into_owned(),
        format!("--language={}", language.codeql_name()),
        format!("--source-root={}", project_dir.display()),
    ];
    let envs = build_java_env(config, language);

    info!("创建 CodeQL 数据库: {}", db_path.display());
    let result = runner.run(&config.codeql.path, &args, &envs)?;
    if !result.success {
        return Err(ScanError::CreateDatabase {
            output: result.output,
        });
    }

    Ok(db_path)
}

/// 对已创建的数据库执行分析，生成 CSV 报告
///
/// 报告路径为 <临时目录>/<项目名>-results.csv。
pub fn analyze(
    config: &Config,
    runner: &dyn CommandRunner,
    db_path: &Path,
    project_dir: &Path,
    language: Language,
) -> Result<PathBuf, ScanError> {
    let temp_dir = effective_temp_dir(config, project_dir);
    let report_path = temp_dir.join(format!("{}-results.csv", project_name(project_dir)));

    let args = vec![
        "database".to_string(),
        "analyze".to_string(),
        db_path.to_string_lossy().into_owned(),
        ruleset_path(config, language),
        "--format=csv".to_string(),
        format!("--output={}", report_path.display()),
    ];

    info!("执行 CodeQL 分析: {}", report_path.display());
    let result = runner.run(&config.codeql.path, &args, &[])?;
    if !result.success {
        return Err(ScanError::Analyze {
            output: result.output,
        });
    }

    Ok(report_path)
}

/// 完整扫描流程：创建数据库 -> 分析 -> 读回报告内容
/// 任何一步失败都会直接中止，后续步骤不再执行
pub fn scan(
    config: &Config,
    runner: &dyn CommandRunner,
    project_dir: &Path,
    language: Language,
) -> Result<String, ScanError> {
    let db_path = create_database(config, runner, project_dir, language)?;
    let report_path = analyze(config, runner, &db_path, project_dir, language)?;

    let report = fs::read_to_string(&report_path)?;
    info!("扫描完成，报告已生成到: {}", report_path.display());
    Ok(report)
}
