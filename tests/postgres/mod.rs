mod manager;
mod pg_store;
