//! 경로별 추출 규칙.
//!
//! 규칙은 순서가 있는 목록이며 위에서부터 평가해 처음 일치한 규칙 하나만 적용한다.

use std::fmt;
use std::sync::Arc;
use telemon_core::config::{ExtractionRuleConfig, FieldMappingConfig, PathMatcherConfig};
use telemon_core::error::CoreError;
use telemon_core::models::telemetry::FieldValue;

/// 경로 조건
#[derive(Clone)]
pub enum PathPredicate {
    Contains(String),
    Prefix(String),
    Exact(String),
    Any,
    /// 코드로 지정하는 임의 조건
    Custom(Arc<dyn Fn(&str) -> bool + Send + Sync>),
}

impl PathPredicate {
    pub fn custom(f: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        PathPredicate::Custom(Arc::new(f))
    }

    pub fn matches(&self, path: &str) -> bool {
        match self {
            PathPredicate::Contains(needle) => path.contains(needle.as_str()),
            PathPredicate::Prefix(prefix) => path.starts_with(prefix.as_str()),
            PathPredicate::Exact(expected) => path == expected,
            PathPredicate::Any => true,
            PathPredicate::Custom(f) => f(path),
        }
    }
}

impl fmt::Debug for PathPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathPredicate::Contains(s) => f.debug_tuple("Contains").field(s).finish(),
            PathPredicate::Prefix(s) => f.debug_tuple("Prefix").field(s).finish(),
            PathPredicate::Exact(s) => f.debug_tuple("Exact").field(s).finish(),
            PathPredicate::Any => f.write_str("Any"),
            PathPredicate::Custom(_) => f.write_str("Custom(<fn>)"),
        }
    }
}

impl From<&PathMatcherConfig> for PathPredicate {
    fn from(config: &PathMatcherConfig) -> Self {
        match config {
            PathMatcherConfig::Contains(s) => PathPredicate::Contains(s.clone()),
            PathMatcherConfig::Prefix(s) => PathPredicate::Prefix(s.clone()),
            PathMatcherConfig::Exact(s) => PathPredicate::Exact(s.clone()),
            PathMatcherConfig::Any => PathPredicate::Any,
        }
    }
}

/// 출력 이름 ← 행 필드 매핑
#[derive(Debug, Clone, PartialEq)]
pub struct FieldMapping {
    /// 출력 레이블/필드 이름
    pub name: String,
    /// 행의 원본 필드 이름
    pub source: String,
    /// 원본 필드가 없을 때 쓸 값
    pub default: Option<FieldValue>,
}

impl From<&FieldMappingConfig> for FieldMapping {
    fn from(config: &FieldMappingConfig) -> Self {
        Self {
            name: config.name.clone(),
            source: config.source.clone(),
            default: config.default.clone(),
        }
    }
}

/// 추출 규칙 하나 = measurement 하나
#[derive(Debug, Clone)]
pub struct ExtractionRule {
    /// measurement 이름
    pub name: String,
    pub predicate: PathPredicate,
    pub labels: Vec<FieldMapping>,
    /// 값 필드 (순서 유지)
    pub fields: Vec<FieldMapping>,
}

impl ExtractionRule {
    pub fn new(name: impl Into<String>, predicate: PathPredicate) -> Self {
        Self {
            name: name.into(),
            predicate,
            labels: Vec::new(),
            fields: Vec::new(),
        }
    }

    pub fn label(mut self, name: impl Into<String>, source: impl Into<String>) -> Self {
        self.labels.push(FieldMapping {
            name: name.into(),
            source: source.into(),
            default: None,
        });
        self
    }

    pub fn field(mut self, name: impl Into<String>, source: impl Into<String>) -> Self {
        self.fields.push(FieldMapping {
            name: name.into(),
            source: source.into(),
            default: None,
        });
        self
    }

    /// 기본값이 있는 값 필드
    pub fn field_with_default(
        mut self,
        name: impl Into<String>,
        source: impl Into<String>,
        default: impl Into<FieldValue>,
    ) -> Self {
        self.fields.push(FieldMapping {
            name: name.into(),
            source: source.into(),
            default: Some(default.into()),
        });
        self
    }

    /// 검증된 설정으로 생성
    pub fn from_config(config: &ExtractionRuleConfig) -> Result<Self, CoreError> {
        config.validate()?;
        Ok(Self {
            name: config.name.clone(),
            predicate: PathPredicate::from(&config.path),
            labels: config.labels.iter().map(FieldMapping::from).collect(),
            fields: config.fields.iter().map(FieldMapping::from).collect(),
        })
    }
}

/// 순서 있는 규칙 목록. 생성 후 변경하지 않으며 파이프라인 간 `Arc`로 공유한다.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<ExtractionRule>,
}

impl RuleSet {
    pub fn new(rules: Vec<ExtractionRule>) -> Self {
        Self { rules }
    }

    pub fn from_config(configs: &[ExtractionRuleConfig]) -> Result<Self, CoreError> {
        let rules = configs
            .iter()
            .map(ExtractionRule::from_config)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(rules))
    }

    /// 경로에 처음 일치하는 규칙
    pub fn first_match(&self, path: &str) -> Option<&ExtractionRule> {
        self.rules.iter().find(|rule| rule.predicate.matches(path))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use telemon_core::config::AppConfig;

    #[test]
    fn predicates_match() {
        assert!(PathPredicate::Contains("interface".into()).matches("a/interfaces/b"));
        assert!(PathPredicate::Prefix("sys".into()).matches("system/cpu"));
        assert!(!PathPredicate::Prefix("cpu".into()).matches("system/cpu"));
        assert!(PathPredicate::Exact("p".into()).matches("p"));
        assert!(!PathPredicate::Exact("p".into()).matches("p/q"));
        assert!(PathPredicate::Any.matches("anything"));
        assert!(PathPredicate::custom(|p| p.ends_with("/cpu")).matches("system/cpu"));
    }

    #[test]
    fn first_matching_rule_wins() {
        let rules = RuleSet::new(vec![
            ExtractionRule::new("specific", PathPredicate::Exact("interfaces/counters".into()))
                .field("x", "x"),
            ExtractionRule::new("general", PathPredicate::Contains("interfaces".into()))
                .field("x", "x"),
            ExtractionRule::new("fallback", PathPredicate::Any).field("x", "x"),
        ]);

        assert_eq!(rules.first_match("interfaces/counters").unwrap().name, "specific");
        assert_eq!(rules.first_match("interfaces/stats").unwrap().name, "general");
        assert_eq!(rules.first_match("bgp/neighbors").unwrap().name, "fallback");
    }

    #[test]
    fn no_match_returns_none() {
        let rules = RuleSet::new(vec![ExtractionRule::new(
            "interface_stats",
            PathPredicate::Contains("interface".into()),
        )
        .field("ifInOctets", "in-octets")]);
        assert!(rules.first_match("bgp/neighbors").is_none());
    }

    #[test]
    fn builds_from_default_config() {
        let config = AppConfig::default_config();
        let rules = RuleSet::from_config(&config.rules).unwrap();

        assert_eq!(rules.len(), 1);
        let rule = rules.first_match("interfaces/interface-stats").unwrap();
        assert_eq!(rule.name, "interface_stats");
        assert_eq!(rule.labels[0].source, "interface-name");
        let names: Vec<&str> = rule.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["ifInOctets", "ifOutOctets", "ifErrors"]);
    }

    #[test]
    fn invalid_rule_config_rejected() {
        let mut config = AppConfig::default_config();
        config.rules[0].fields.clear();
        assert!(RuleSet::from_config(&config.rules).is_err());
    }

    #[test]
    fn custom_predicate_debug_output() {
        let predicate = PathPredicate::custom(|_| true);
        assert_eq!(format!("{predicate:?}"), "Custom(<fn>)");
    }
}
