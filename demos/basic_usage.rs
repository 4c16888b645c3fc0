//! Basic usage: migrations, schema population, and dirty-tracked saves
//!
//! Run against a disposable database:
//!
//! ```text
//! MYSQL_HOST=127.0.0.1 MYSQL_USER=root MYSQL_DATABASE=record_demo \
//!     cargo run --example basic_usage
//! ```

use mysql_record_system::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    let db = MySqlDatabase::new(MySqlConfig::from_env())?;
    db.init().await?;

    db.exec(
        "CREATE TABLE IF NOT EXISTS `users` ( \
         `id` int unsigned NOT NULL AUTO_INCREMENT, \
         `name` varchar(255) NOT NULL DEFAULT '', \
         `is_active` tinyint(1) NOT NULL DEFAULT '1', \
         PRIMARY KEY (`id`) \
         ) ENGINE=InnoDB",
        Vec::new(),
    )
    .await?;
    db.populate_schema().await?;

    let inserted = db
        .insert(
            "users",
            FieldMap::new().field("name", "Alice").field("is_active", true),
        )
        .await?;
    println!("inserted user id: {:?}", inserted.id());

    let mut user = db
        .fetch_one("users", &inserted.key(), &FetchOptions::new())
        .await?
        .expect("user should exist");
    println!("is_active decodes as: {:?}", user.get("is_active"));

    user.set("is_active", false);
    user.set("name", "Alice A.");
    println!("dirty fields: {:?}", user.dirty());

    let saved = db.save(&mut user).await?;
    println!("saved: {saved}, dirty after save: {}", user.is_dirty());

    db.disconnect().await?;
    Ok(())
}
