//! Members who share the subscription cost and when they pay.

mod create;
mod db;
mod delete;
mod domain;
mod edit;
mod list;
mod state;

pub use create::create_member_endpoint;
pub use db::{
    create_member, create_member_table, delete_member, get_member, get_member_stats, get_members,
    get_overdue_members, get_upcoming_members, mark_member_paid, restore_member, update_member,
};
pub use delete::delete_member_endpoint;
pub use domain::{
    DEFAULT_MONTHLY_AMOUNT, DEFAULT_YEARLY_AMOUNT, Member, MemberFilter, MemberForm, MemberId,
    MemberStats, MemberView, PaymentStatus, PaymentType, name_key, next_due_date,
};
pub use edit::{mark_member_paid_endpoint, update_member_endpoint};
pub use list::{
    DEFAULT_UPCOMING_DAYS, get_member_endpoint, get_member_stats_endpoint,
    get_overdue_members_endpoint, get_upcoming_members_endpoint, list_members_endpoint,
};
pub use state::MemberState;
