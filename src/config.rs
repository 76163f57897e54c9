use crate::model::Config;
use anyhow::{bail, Context, Result};
use std::fs;
use std::path::Path;

/// 配置文件固定放在程序运行目录下
pub const CONFIG_FILENAME: &str = "config.json";

/// 加载配置文件
///
/// 从当前运行目录读取 config.json。文件缺失或 JSON 格式错误都会直接报错，
/// 由调用方决定是否中止启动。
pub fn load() -> Result<Config> {
    let cwd = std::env::current_dir().with_context(|| "获取当前目录失败")?;
    load_from(Path::new(CONFIG_FILENAME), &cwd)
}

/// 从指定路径加载配置，temp_dir 的相对路径基于 base_dir 解析
///
/// # 参数
/// * `path` - 配置文件路径
/// * `base_dir` - 解析相对 temp_dir 时使用的基准目录（通常是当前运行目录）
pub fn load_from(path: &Path, base_dir: &Path) -> Result<Config> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("读取配置文件失败: {}", path.display()))?;

    let mut config: Config = serde_json::from_str(&content)
        .with_context(|| format!("解析配置文件失败: {}", path.display()))?;

    // 如果配置的临时目录是相对路径，则基于基准目录解析为绝对路径。
    // 为空时保持为空，扫描时会退回到项目目录。
    if !config.workspace.temp_dir.is_empty() {
        let temp_dir = Path::new(&config.workspace.temp_dir);
        if temp_dir.is_relative() {
            config.workspace.temp_dir = base_dir.join(temp_dir).to_string_lossy().into_owned();
        }
    }

    Ok(config)
}

/// 保存配置到运行目录下的 config.json
pub fn save(config: &Config) -> Result<()> {
    save_to(config, Path::new(CONFIG_FILENAME))
}

/// 保存配置到指定路径，无条件覆盖
/// 使用 pretty print 格式化输出，方便人类阅读
pub fn save_to(config: &Config, path: &Path) -> Result<()> {
    let content = serde_json::to_string_pretty(config).with_context(|| "生成配置文件失败")?;

    fs::write(path, content)
        .with_context(|| format!("保存配置文件失败: {}", path.display()))?;

    Ok(())
}

/// 按点分隔的键修改单个配置字段
///
/// 支持的键:
/// * `codeql.path` / `codeql.rules_path` / `codeql.rules_path_enabled`
/// * `codeql.queries.<language>` - 某个语言的默认规则库
/// * `maven.path`
/// * `workspace.temp_dir`
pub fn set_field(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        "codeql.path" => config.codeql.path = value.to_string(),
        "codeql.rules_path" => config.codeql.rules_path = value.to_string(),
        "codeql.rules_path_enabled" => {
            config.codeql.rules_path_enabled = value
                .parse::<bool>()
                .map_err(|_| anyhow::anyhow!("无效的布尔值: {} (应为 true 或 false)", value))?;
        }
        "maven.path" => config.maven.path = value.to_string(),
        "workspace.temp_dir" => config.workspace.temp_dir = value.to_string(),
        _ => {
            if let Some(lang) = key.strip_prefix("codeql.queries.") {
                config
                    .codeql
                    .queries
                    .insert(lang.to_lowercase(), value.to_string());
            } else {
                bail!("未知的配置项: {}", key);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn sample_config_json() -> &'static str {
        r#"{
            "codeql": {
                "path": "/opt/codeql/codeql",
                "rules_path": "",
                "rules_path_enabled": false,
                "queries": {
                    "java": "/opt/rules/java-security.qls",
                    "python": "/opt/rules/python-security.qls"
                }
            },
            "maven": { "path": "" },
            "workspace": { "temp_dir": "scan_tmp" }
        }"#
    }

    #[test]
    fn test_load_resolves_relative_temp_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.json");
        fs::write(&config_path, sample_config_json()).unwrap();

        let base = PathBuf::from("/work/base");
        let config = load_from(&config_path, &base).unwrap();

        // 相对的 temp_dir 应基于基准目录解析为绝对路径
        assert_eq!(
            PathBuf::from(&config.workspace.temp_dir),
            base.join("scan_tmp")
        );
        assert_eq!(config.codeql.path, "/opt/codeql/codeql");
        assert_eq!(
            config.codeql.queries.get("java").unwrap(),
            "/opt/rules/java-security.qls"
        );
    }

    #[test]
    fn test_load_keeps_absolute_temp_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.json");
        let json = sample_config_json().replace("scan_tmp", "/abs/tmp");
        fs::write(&config_path, json).unwrap();

        let config = load_from(&config_path, Path::new("/work/base")).unwrap();
        assert_eq!(config.workspace.temp_dir, "/abs/tmp");
    }

    #[test]
    fn test_load_keeps_empty_temp_dir() {
        // 为空时不解析，扫描器会退回到项目目录
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.json");
        let json = sample_config_json().replace("scan_tmp", "");
        fs::write(&config_path, json).unwrap();

        let config = load_from(&config_path, Path::new("/work/base")).unwrap();
        assert!(config.workspace.temp_dir.is_empty());
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.json");
        fs::write(&config_path, sample_config_json()).unwrap();

        let config = load_from(&config_path, dir.path()).unwrap();
        save_to(&config, &config_path).unwrap();
        let reloaded = load_from(&config_path, dir.path()).unwrap();

        // 保存后重新加载，所有字段值应完全一致
        assert_eq!(config, reloaded);
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_from(Path::new("/no/such/config.json"), Path::new("/")).unwrap_err();
        assert!(err.to_string().contains("读取配置文件失败"));
    }

    #[test]
    fn test_load_malformed_json() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.json");
        fs::write(&config_path, "{ not json").unwrap();

        let err = load_from(&config_path, dir.path()).unwrap_err();
        assert!(err.to_string().contains("解析配置文件失败"));
    }

    #[test]
    fn test_set_field() {
        let mut config = Config::default();

        set_field(&mut config, "codeql.path", "/usr/bin/codeql").unwrap();
        set_field(&mut config, "codeql.rules_path_enabled", "true").unwrap();
        set_field(&mut config, "codeql.queries.Java", "/rules/java.qls").unwrap();
        set_field(&mut config, "workspace.temp_dir", "/tmp/scan").unwrap();

        assert_eq!(config.codeql.path, "/usr/bin/codeql");
        assert!(config.codeql.rules_path_enabled);
        // 语言键统一转为小写存储
        assert_eq!(config.codeql.queries.get("java").unwrap(), "/rules/java.qls");
        assert_eq!(config.workspace.temp_dir, "/tmp/scan");

        assert!(set_field(&mut config, "codeql.rules_path_enabled", "yes").is_err());
        assert!(set_field(&mut config, "unknown.key", "x").is_err());
    }
}
