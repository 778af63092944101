//! 역할 도출.
//!
//! 워크스페이스별 세분화된 멤버십을 요청 단위의 거친 권한 플래그로 축약합니다.

use serde::{Deserialize, Serialize};

use super::{AccessClaims, IdentityClaims, WorkspaceRole};

/// 플랫폼 수준 역할.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// 학생 - 기본 플랫폼 접근
    Student,
    /// 교사 - 하나 이상의 워크스페이스에서 교사
    Teacher,
    /// 관리자 - 시스템 관리자
    Admin,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Student, Role::Teacher, Role::Admin];
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Role::Student => "student",
            Role::Teacher => "teacher",
            Role::Admin => "admin",
        };
        write!(f, "{}", s)
    }
}

/// 역할 플래그 집합.
///
/// 요청마다 클레임에서 도출되며 영속화되지 않습니다. 접근 정책 항목의
/// 필요 역할도 같은 타입으로 표현합니다 (OR 의미).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoleSet {
    pub admin: bool,
    pub teacher: bool,
    pub student: bool,
}

impl RoleSet {
    /// 빈 집합.
    pub const NONE: RoleSet = RoleSet {
        admin: false,
        teacher: false,
        student: false,
    };

    /// 클레임에서 역할 도출.
    ///
    /// - `admin`: `system_admin`
    /// - `teacher`: 어느 워크스페이스에서든 교사이면 true
    /// - `student`: 멤버십과 무관하게 항상 true
    ///
    /// 멤버십이 없는 사용자도 `student` 기본 권한을 받습니다. 제품 의도가
    /// 확정되기 전까지 이 동작을 유지합니다.
    pub fn from_claims(claims: &IdentityClaims) -> Self {
        Self {
            admin: claims.system_admin,
            teacher: claims
                .workspace_role
                .values()
                .any(|role| *role == WorkspaceRole::Teacher),
            student: true,
        }
    }

    /// 역할 목록으로부터 집합 생성.
    pub fn from_roles<I: IntoIterator<Item = Role>>(roles: I) -> Self {
        roles.into_iter().fold(Self::NONE, |mut set, role| {
            set.insert(role);
            set
        })
    }

    pub fn insert(&mut self, role: Role) {
        match role {
            Role::Student => self.student = true,
            Role::Teacher => self.teacher = true,
            Role::Admin => self.admin = true,
        }
    }

    pub fn contains(&self, role: Role) -> bool {
        match role {
            Role::Student => self.student,
            Role::Teacher => self.teacher,
            Role::Admin => self.admin,
        }
    }

    /// `required` 중 하나라도 보유하면 true.
    pub fn satisfies(&self, required: &RoleSet) -> bool {
        Role::ALL
            .iter()
            .any(|role| self.contains(*role) && required.contains(*role))
    }

    pub fn is_empty(&self) -> bool {
        !self.admin && !self.teacher && !self.student
    }

    /// 보유 역할 목록 (student, teacher, admin 순).
    pub fn roles(&self) -> Vec<Role> {
        Role::ALL
            .iter()
            .copied()
            .filter(|role| self.contains(*role))
            .collect()
    }
}

/// 검증된 Access Token 클레임에서 역할 도출.
pub fn derive_roles(claims: &AccessClaims) -> RoleSet {
    RoleSet::from_claims(&claims.identity)
}
