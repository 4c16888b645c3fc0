//! Transactions: explicit commit/rollback and the closure helper
//!
//! Run against a disposable database:
//!
//! ```text
//! MYSQL_HOST=127.0.0.1 MYSQL_USER=root MYSQL_DATABASE=record_demo \
//!     cargo run --example transactions
//! ```

use mysql_record_system::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    let db = MySqlDatabase::new(MySqlConfig::from_env())?;
    db.init().await?;

    db.exec(
        "CREATE TABLE IF NOT EXISTS `accounts` ( \
         `id` int unsigned NOT NULL AUTO_INCREMENT, \
         `owner` varchar(255) NOT NULL, \
         `balance` decimal(10,2) NOT NULL DEFAULT '0.00', \
         PRIMARY KEY (`id`) \
         ) ENGINE=InnoDB",
        Vec::new(),
    )
    .await?;
    db.populate_schema().await?;

    // explicit lifecycle: every statement runs on one dedicated connection
    let mut txn = db.start_transaction().await?;
    let from = txn
        .insert(
            "accounts",
            FieldMap::new().field("owner", "alice").field("balance", 100.0),
        )
        .await?;
    let to = txn
        .insert(
            "accounts",
            FieldMap::new().field("owner", "bob").field("balance", 0.0),
        )
        .await?;
    txn.commit().await?;
    println!("created accounts {:?} and {:?}", from.id(), to.id());

    // closure helper: commit on success, rollback and rethrow on error
    let transferred = db
        .run_in_transaction(|txn| {
            Box::pin(async move {
                txn.exec(
                    "UPDATE `accounts` SET `balance` = `balance` - ? WHERE `owner` = ?",
                    vec![Value::Double(25.0), Value::from("alice")],
                )
                .await?;
                txn.exec(
                    "UPDATE `accounts` SET `balance` = `balance` + ? WHERE `owner` = ?",
                    vec![Value::Double(25.0), Value::from("bob")],
                )
                .await?;
                Ok(25.0)
            })
        })
        .await?;
    println!("transferred: {transferred}");

    let bob = db
        .fetch_one("accounts", &Where::new().eq("owner", "bob"), &FetchOptions::new())
        .await?
        .expect("bob should exist");
    println!("bob's balance: {:?}", bob.get("balance"));

    db.disconnect().await?;
    Ok(())
}
