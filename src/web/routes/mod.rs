pub mod credential_routes;
