mod authority_props;
mod correction;
mod pipeline;
mod wire_format;
