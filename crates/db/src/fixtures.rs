use sqlx::Row;
use tracing::info;

use crate::connection::DbPool;

/// Canonical demo rows for the fact store. The controllers' end-to-end
/// expectations (engineering headcount, product listing) are pinned to
/// these values.
const SEED_EMPLOYEES: &[(i64, &str, &str, i64)] = &[
    (1, "Alice", "Engineering", 90_000),
    (2, "Bob", "Sales", 75_000),
    (3, "Charlie", "Engineering", 110_000),
    (4, "Diana", "Sales", 82_000),
];

const SEED_PRODUCTS: &[(i64, &str, f64)] =
    &[(1, "Laptop", 1200.00), (2, "Mouse", 25.50), (3, "Keyboard", 75.00)];

// (id, product_id, employee_id, quantity)
const SEED_SALES: &[(i64, i64, i64, i64)] = &[(1, 1, 2, 5), (2, 3, 4, 10), (3, 2, 2, 8)];

pub const ENGINEERING_HEADCOUNT: i64 = 2;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SeedResult {
    pub employees: usize,
    pub products: usize,
    pub sales: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerificationResult {
    pub passed: bool,
    pub failures: Vec<String>,
}

/// Deterministic seed dataset for the demo deployment. Applying it twice
/// leaves the store in the same state.
pub struct SeedDataset;

impl SeedDataset {
    pub async fn apply(pool: &DbPool) -> Result<SeedResult, sqlx::Error> {
        let mut tx = pool.begin().await?;

        // Fresh build: the fact store is static after setup, so a reseed
        // replaces rather than appends.
        sqlx::query("DELETE FROM sales").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM employees").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM products").execute(&mut *tx).await?;

        for (id, name, department, salary) in SEED_EMPLOYEES {
            sqlx::query("INSERT INTO employees (id, name, department, salary) VALUES (?, ?, ?, ?)")
                .bind(id)
                .bind(name)
                .bind(department)
                .bind(salary)
                .execute(&mut *tx)
                .await?;
        }
        for (id, name, price) in SEED_PRODUCTS {
            sqlx::query("INSERT INTO products (id, name, price) VALUES (?, ?, ?)")
                .bind(id)
                .bind(name)
                .bind(price)
                .execute(&mut *tx)
                .await?;
        }
        for (id, product_id, employee_id, quantity) in SEED_SALES {
            sqlx::query(
                "INSERT INTO sales (id, product_id, employee_id, quantity) VALUES (?, ?, ?, ?)",
            )
            .bind(id)
            .bind(product_id)
            .bind(employee_id)
            .bind(quantity)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        info!(
            employees = SEED_EMPLOYEES.len(),
            products = SEED_PRODUCTS.len(),
            sales = SEED_SALES.len(),
            "fact store seeded"
        );

        Ok(SeedResult {
            employees: SEED_EMPLOYEES.len(),
            products: SEED_PRODUCTS.len(),
            sales: SEED_SALES.len(),
        })
    }

    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, sqlx::Error> {
        let mut failures = Vec::new();

        let checks: &[(&str, i64)] = &[
            ("employees", SEED_EMPLOYEES.len() as i64),
            ("products", SEED_PRODUCTS.len() as i64),
            ("sales", SEED_SALES.len() as i64),
        ];
        for (table, expected) in checks {
            let count = sqlx::query(&format!("SELECT COUNT(*) AS count FROM {table}"))
                .fetch_one(pool)
                .await?
                .get::<i64, _>("count");
            if count != *expected {
                failures.push(format!("table `{table}` has {count} rows, expected {expected}"));
            }
        }

        let engineering = sqlx::query(
            "SELECT COUNT(*) AS count FROM employees WHERE department = 'Engineering'",
        )
        .fetch_one(pool)
        .await?
        .get::<i64, _>("count");
        if engineering != ENGINEERING_HEADCOUNT {
            failures.push(format!(
                "engineering headcount is {engineering}, expected {ENGINEERING_HEADCOUNT}"
            ));
        }

        Ok(VerificationResult { passed: failures.is_empty(), failures })
    }
}
