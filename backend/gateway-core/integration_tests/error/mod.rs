mod gateway_error;
mod transport_error;
