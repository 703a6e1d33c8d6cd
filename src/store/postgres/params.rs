use typed_builder::TypedBuilder;

/// Connection parameters for the database backing a [`super::PgStore`].
#[derive(TypedBuilder, Debug, Clone)]
pub struct ConnectionParams {
    #[builder(setter(into))]
    host: String,
    #[builder(default = 5432)]
    port: u16,
    #[builder(setter(into))]
    user: String,
    #[builder(setter(into))]
    password: String,
    #[builder(setter(into))]
    database: String,
    #[builder(default = 5)]
    max_connections: u32,
}

impl ConnectionParams {
    pub fn postgres_url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.user, self.password, self.host, self.port, self.database
        )
    }

    pub fn max_connections(&self) -> u32 {
        self.max_connections
    }
}
