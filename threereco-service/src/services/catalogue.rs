//! Static catalogue of assignable permission strings, grouped for
//! presentation.

use std::collections::HashSet;
use std::sync::OnceLock;

use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionGroup {
    pub name: &'static str,
    pub permissions: &'static [&'static str],
    pub sub_groups: &'static [PermissionGroup],
}

macro_rules! crud {
    ($domain:literal) => {
        &[
            concat!($domain, ".*"),
            concat!($domain, ".view"),
            concat!($domain, ".create"),
            concat!($domain, ".update"),
            concat!($domain, ".delete"),
        ]
    };
}

macro_rules! assignment {
    ($name:literal, $prefix:literal) => {
        PermissionGroup {
            name: $name,
            permissions: &[
                concat!($prefix, ".view"),
                concat!($prefix, ".assign"),
                concat!($prefix, ".unassign"),
            ],
            sub_groups: &[],
        }
    };
}

pub static CATALOGUE: &[PermissionGroup] = &[
    PermissionGroup {
        name: "Global",
        permissions: &["*"],
        sub_groups: &[],
    },
    PermissionGroup {
        name: "Users",
        permissions: crud!("users"),
        sub_groups: &[
            PermissionGroup {
                name: "Self",
                permissions: &["users.view.self", "users.update.self", "users.delete.self"],
                sub_groups: &[],
            },
            assignment!("Roles", "users.roles"),
        ],
    },
    PermissionGroup {
        name: "Organizations",
        permissions: crud!("organizations"),
        sub_groups: &[
            assignment!("Users", "organizations.users"),
            assignment!("Roles", "organizations.roles"),
        ],
    },
    PermissionGroup {
        name: "Roles",
        permissions: crud!("roles"),
        sub_groups: &[],
    },
    PermissionGroup {
        name: "Materials",
        permissions: crud!("materials"),
        sub_groups: &[],
    },
    PermissionGroup {
        name: "Products",
        permissions: crud!("products"),
        sub_groups: &[assignment!("Materials", "products.materials")],
    },
    PermissionGroup {
        name: "Collections",
        permissions: crud!("collections"),
        sub_groups: &[assignment!("Materials", "collections.materials")],
    },
    PermissionGroup {
        name: "Transactions",
        permissions: crud!("transactions"),
        sub_groups: &[assignment!("Products", "transactions.products")],
    },
    PermissionGroup {
        name: "Bank Details",
        permissions: crud!("bank_details"),
        sub_groups: &[],
    },
    PermissionGroup {
        name: "Notifications",
        permissions: crud!("notifications"),
        sub_groups: &[],
    },
    PermissionGroup {
        name: "Audit Logs",
        permissions: &["audit_logs.view"],
        sub_groups: &[],
    },
];

fn collect(groups: &'static [PermissionGroup], out: &mut HashSet<&'static str>) {
    for group in groups {
        out.extend(group.permissions.iter().copied());
        collect(group.sub_groups, out);
    }
}

fn leaves() -> &'static HashSet<&'static str> {
    static LEAVES: OnceLock<HashSet<&'static str>> = OnceLock::new();
    LEAVES.get_or_init(|| {
        let mut set = HashSet::new();
        collect(CATALOGUE, &mut set);
        set
    })
}

pub fn is_assignable(permission: &str) -> bool {
    leaves().contains(permission.trim())
}

/// Returns the entries of `permissions` missing from the catalogue.
pub fn unknown<'a>(permissions: &'a [String]) -> Vec<&'a str> {
    permissions
        .iter()
        .map(String::as_str)
        .filter(|p| !is_assignable(p))
        .collect()
}
