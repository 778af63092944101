//! 엔드포인트 접근 정책 매처.
//!
//! 선언된 경로 패턴과 필요 역할 테이블을 기준으로 요청 경로 접근 여부를 판단합니다.
//! 테이블은 시작 시 한 번 구성되는 읽기 전용 설정이므로 요청 처리 중 잠금이 필요 없습니다.
//!
//! # 매칭 순서
//!
//! 1. 경로 문자열과 패턴 문자열이 정확히 일치하는 항목이 있으면 그 항목만으로 판정
//! 2. 없으면 와일드카드 패턴을 선언 순서대로 검사. 세그먼트 수가 같고 리터럴
//!    세그먼트가 모두 일치하면 구조적 일치이며, 역할이 충분한 첫 패턴에서 허용.
//!    역할이 부족한 패턴은 건너뛰고 계속 검사
//! 3. 일치하는 패턴이 없거나 모두 역할이 부족하면 거부

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{Role, RoleSet};

/// 정책 테이블 구성 에러.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PolicyError {
    #[error("경로 패턴은 '/'로 시작해야 합니다: {0}")]
    InvalidPattern(String),
    #[error("중복된 경로 패턴: {0}")]
    DuplicatePattern(String),
}

/// 설정 파일에 선언되는 정책 규칙.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyRule {
    /// 경로 패턴 (예: `/agents/agent/{agent_id}`)
    pub pattern: String,
    /// 접근 가능한 역할 (하나만 보유해도 충분)
    pub roles: Vec<Role>,
}

impl PolicyRule {
    pub fn new(pattern: impl Into<String>, roles: &[Role]) -> Self {
        Self {
            pattern: pattern.into(),
            roles: roles.to_vec(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Wildcard,
}

/// 파싱된 경로 패턴.
///
/// `{`를 포함한 세그먼트는 임의의 단일 세그먼트와 일치합니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    raw: String,
    segments: Vec<Segment>,
}

impl PathPattern {
    pub fn parse(pattern: &str) -> Result<Self, PolicyError> {
        if !pattern.starts_with('/') {
            return Err(PolicyError::InvalidPattern(pattern.to_string()));
        }

        let segments = pattern
            .split('/')
            .map(|segment| {
                if segment.contains('{') {
                    Segment::Wildcard
                } else {
                    Segment::Literal(segment.to_string())
                }
            })
            .collect();

        Ok(Self {
            raw: pattern.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn has_wildcard(&self) -> bool {
        self.segments.iter().any(|s| *s == Segment::Wildcard)
    }

    /// 세그먼트 단위 구조적 일치 여부.
    pub fn matches(&self, path: &str) -> bool {
        let mut parts = path.split('/');
        for segment in &self.segments {
            match (segment, parts.next()) {
                (_, None) => return false,
                (Segment::Wildcard, Some(_)) => {}
                (Segment::Literal(literal), Some(part)) => {
                    if literal != part {
                        return false;
                    }
                }
            }
        }
        parts.next().is_none()
    }
}

#[derive(Debug, Clone)]
struct PolicyEntry {
    pattern: PathPattern,
    required: RoleSet,
}

/// 정책 판정 결과.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyDecision {
    /// 접근 허용
    Allow,
    /// 경로는 정책에 있으나 역할 부족
    Denied,
    /// 경로를 다루는 정책 항목 없음
    Unmatched,
}

impl PolicyDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, PolicyDecision::Allow)
    }
}

/// 접근 정책 테이블.
#[derive(Debug, Clone)]
pub struct AccessPolicy {
    entries: Vec<PolicyEntry>,
    exact: HashMap<String, usize>,
    wildcard: Vec<usize>,
}

impl AccessPolicy {
    /// 선언 순서를 유지하며 정책 테이블을 구성합니다.
    ///
    /// # Errors
    ///
    /// - `PolicyError::InvalidPattern`: `/`로 시작하지 않는 패턴
    /// - `PolicyError::DuplicatePattern`: 같은 패턴이 두 번 선언됨
    pub fn new<'a, I>(rules: I) -> Result<Self, PolicyError>
    where
        I: IntoIterator<Item = &'a PolicyRule>,
    {
        let mut entries = Vec::new();
        let mut exact = HashMap::new();
        let mut wildcard = Vec::new();

        for rule in rules {
            let pattern = PathPattern::parse(&rule.pattern)?;
            let index = entries.len();
            if exact.insert(rule.pattern.clone(), index).is_some() {
                return Err(PolicyError::DuplicatePattern(rule.pattern.clone()));
            }
            if pattern.has_wildcard() {
                wildcard.push(index);
            }
            entries.push(PolicyEntry {
                pattern,
                required: RoleSet::from_roles(rule.roles.iter().copied()),
            });
        }

        Ok(Self {
            entries,
            exact,
            wildcard,
        })
    }

    /// 경로와 역할 집합에 대한 판정.
    pub fn decide(&self, roles: &RoleSet, path: &str) -> PolicyDecision {
        if let Some(&index) = self.exact.get(path) {
            return if roles.satisfies(&self.entries[index].required) {
                PolicyDecision::Allow
            } else {
                PolicyDecision::Denied
            };
        }

        let mut matched = false;
        for &index in &self.wildcard {
            let entry = &self.entries[index];
            if !entry.pattern.matches(path) {
                continue;
            }
            matched = true;
            if roles.satisfies(&entry.required) {
                return PolicyDecision::Allow;
            }
        }

        if matched {
            PolicyDecision::Denied
        } else {
            PolicyDecision::Unmatched
        }
    }

    pub fn allowed(&self, roles: &RoleSet, path: &str) -> bool {
        self.decide(roles, path).is_allowed()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 선언 순서대로 패턴 목록 반환.
    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.pattern.as_str())
    }
}

/// 정책 테이블 기준 접근 허용 여부.
pub fn allowed(policy: &AccessPolicy, roles: &RoleSet, path: &str) -> bool {
    policy.allowed(roles, path)
}

/// 인증 없이 통과시키는 경로 집합.
#[derive(Debug, Clone, Default)]
pub struct PublicRoutes {
    exact: Vec<String>,
    patterns: Vec<PathPattern>,
}

impl PublicRoutes {
    pub fn new(exempt_paths: &[String], public_patterns: &[String]) -> Result<Self, PolicyError> {
        let patterns = public_patterns
            .iter()
            .map(|p| PathPattern::parse(p))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            exact: exempt_paths.to_vec(),
            patterns,
        })
    }

    /// 논리 경로가 면제 목록에 있거나 공개 패턴과 일치하면 true.
    pub fn is_public(&self, path: &str) -> bool {
        self.exact.iter().any(|p| p == path) || self.patterns.iter().any(|p| p.matches(path))
    }
}

/// 버전/환경 접두사를 제거한 논리 경로를 반환합니다.
///
/// 경로를 `/`로 나눈 뒤 앞의 `depth`개 조각을 버립니다. 선행 `/` 때문에 첫
/// 조각은 항상 빈 문자열이므로 depth 4는 `/v1/dev/admin`을 제거합니다.
///
/// ```
/// use tutor_core::logical_path;
///
/// assert_eq!(logical_path("/v1/dev/admin/agents/agents", 4), "/agents/agents");
/// assert_eq!(logical_path("/v1/prod/user", 4), "/");
/// ```
pub fn logical_path(path: &str, depth: usize) -> String {
    let rest: Vec<&str> = path.split('/').skip(depth).collect();
    format!("/{}", rest.join("/"))
}
