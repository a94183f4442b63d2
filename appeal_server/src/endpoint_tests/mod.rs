mod helpers;
mod mocks;

mod leads;
mod orders;
mod precheck;
mod reports;
mod webhooks;
