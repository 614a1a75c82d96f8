//! Integration tests for monsync-opensearch
//!
//! Uses wiremock to simulate the Alerting API and verifies the gateway's
//! requests, response parsing and error classification.


mod test_errors;
mod test_gateway;
