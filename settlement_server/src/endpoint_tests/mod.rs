mod helpers;
mod ledger;
mod mocks;
mod orders;
mod webhook;
