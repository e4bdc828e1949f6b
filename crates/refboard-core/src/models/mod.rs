use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password_hash: String,
    pub balance: f64,
    pub total_earned: f64,
    pub referral_count: i64,
    pub referral_earnings: f64,
    pub is_verified: bool,
    pub referral_code: String,
    pub status: String,
    pub last_login: Option<String>,
    pub payment_methods: Vec<PaymentMethod>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPublic {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub balance: f64,
    pub total_earned: f64,
    pub referral_count: i64,
    pub referral_earnings: f64,
    pub is_verified: bool,
    pub referral_code: String,
    pub status: String,
    pub last_login: Option<String>,
    pub payment_methods: Vec<PaymentMethod>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<User> for UserPublic {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            first_name: u.first_name,
            last_name: u.last_name,
            email: u.email,
            balance: u.balance,
            total_earned: u.total_earned,
            referral_count: u.referral_count,
            referral_earnings: u.referral_earnings,
            is_verified: u.is_verified,
            referral_code: u.referral_code,
            status: u.status,
            last_login: u.last_login,
            payment_methods: u.payment_methods,
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub user_id: String,
    pub token: String,
    pub expires_at: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationToken {
    pub id: String,
    pub user_id: String,
    pub token: String,
    pub expires_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferralStatus {
    Pending,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Referral {
    pub id: String,
    pub user_id: String,
    pub referee_email: String,
    pub referee_name: Option<String>,
    pub status: ReferralStatus,
    pub bonus_amount: f64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamMember {
    pub user_id: String,
    pub role: String,
    pub joined_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Team {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub members: Vec<TeamMember>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub user_id: String,
    pub amount: f64,
    pub transaction_type: String,
    pub status: PaymentStatus,
    pub description: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentMethod {
    pub method_type: String,
    pub provider: String,
    pub account_number: String,
    pub account_name: String,
    pub currency: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: String,
    pub user_id: String,
    pub payment_type: String,
    pub amount: f64,
    pub status: PaymentStatus,
    pub payment_method: PaymentMethod,
    pub reference: String,
    pub description: Option<String>,
    pub notes: Option<String>,
    pub processed_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}
