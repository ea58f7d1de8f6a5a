use rusqlite::Connection;

pub fn migrate(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS orders (
            id                  INTEGER PRIMARY KEY AUTOINCREMENT,
            full_name           TEXT NOT NULL,
            mobile_number       TEXT NOT NULL,
            full_address        TEXT NOT NULL,
            product_id          TEXT NOT NULL,
            quantity            INTEGER NOT NULL,
            ip_address          TEXT,
            device_fingerprint  TEXT,
            created_at          TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_orders_mobile ON orders(mobile_number);
        CREATE INDEX IF NOT EXISTS idx_orders_ip ON orders(ip_address);
        CREATE INDEX IF NOT EXISTS idx_orders_device ON orders(device_fingerprint);
        CREATE INDEX IF NOT EXISTS idx_orders_created ON orders(created_at DESC);
        ",
    )?;
    Ok(())
}
