pub use super::assets::Entity as Assets;
pub use super::portfolio_positions::Entity as PortfolioPositions;
pub use super::portfolios::Entity as Portfolios;
pub use super::transactions::Entity as Transactions;
pub use super::user_profiles::Entity as UserProfiles;
pub use super::user_sessions::Entity as UserSessions;
pub use super::users::Entity as Users;
