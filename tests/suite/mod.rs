mod check_in;
mod journey;
mod rpc;
