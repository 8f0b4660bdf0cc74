/// Router Module Index
///
/// Splits the API by the access level each route needs. Authentication is applied as a
/// layer per router in `create_router`; role checks (faculty, admin, ownership) happen in
/// the handlers.

/// Anonymous, read-only access to published content.
pub mod public;

/// Any signed-in user: session, progress, enrolment, playgrounds.
pub mod learner;

/// Authoring routes for faculty and admins.
pub mod faculty;

/// Administration, nested under `/api/admin`.
pub mod admin;
