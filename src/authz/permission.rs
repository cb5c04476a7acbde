use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Generates the closed permission enum together with its wire names.
macro_rules! permission_catalog {
    ($($variant:ident => $name:literal),+ $(,)?) => {
        /// Every capability the system understands.
        ///
        /// The persisted `permissions` table mirrors this list and is
        /// reconciled against it at startup.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum Permission {
            $(
                #[serde(rename = $name)]
                $variant,
            )+
        }

        impl Permission {
            /// All members, in declaration order.
            pub const ALL: &'static [Permission] = &[$(Permission::$variant),+];

            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Permission::$variant => $name,)+
                }
            }
        }

        impl FromStr for Permission {
            type Err = UnknownPermission;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($name => Ok(Permission::$variant),)+
                    other => Err(UnknownPermission(other.to_string())),
                }
            }
        }
    };
}

permission_catalog! {
    AdminPermission => "AdminPermission",

    CategoryCreate => "Category_Create",
    CategoryGetAll => "Category_GetAll",
    CategoryGetById => "Category_GetById",
    CategoryUpdate => "Category_Update",
    CategoryDelete => "Category_Delete",

    UserCreate => "User_Create",
    UserGetAll => "User_GetAll",
    UserGetById => "User_GetById",
    UserUpdate => "User_Update",
    UserDelete => "User_Delete",

    ProductCreate => "Product_Create",
    ProductGetAll => "Product_GetAll",
    ProductGetById => "Product_GetById",
    ProductUpdate => "Product_Update",
    ProductDelete => "Product_Delete",

    RoleCreate => "Role_Create",
    RoleGetAll => "Role_GetAll",
    RoleGetById => "Role_GetById",
    RoleUpdate => "Role_Update",
    RoleDelete => "Role_Delete",

    CouponCreate => "Coupon_Create",
    CouponGetAll => "Coupon_GetAll",
    CouponGetById => "Coupon_GetById",
    CouponUpdate => "Coupon_Update",
    CouponDelete => "Coupon_Delete",

    CartCreate => "Cart_Create",
    CartGetAll => "Cart_GetAll",
    CartGetById => "Cart_GetById",
    CartUpdate => "Cart_Update",
    CartDelete => "Cart_Delete",

    PermissionCreate => "Permission_Create",
    PermissionGetAll => "Permission_GetAll",
    PermissionGetById => "Permission_GetById",
    PermissionUpdate => "Permission_Update",
    PermissionDelete => "Permission_Delete",

    OrderCreate => "Order_Create",
    OrderGetAll => "Order_GetAll",
    OrderGetById => "Order_GetById",
    OrderUpdate => "Order_Update",
    OrderDelete => "Order_Delete",

    CartItemCreate => "CartItem_Create",
    CartItemGetAll => "CartItem_GetAll",
    CartItemGetById => "CartItem_GetById",
    CartItemUpdate => "CartItem_Update",
    CartItemDelete => "CartItem_Delete",

    WishListCreate => "WishList_Create",
    WishListGetAll => "WishList_GetAll",
    WishListGetById => "WishList_GetById",
    WishListUpdate => "WishList_Update",
    WishListDelete => "WishList_Delete",

    ReviewCreate => "Review_Create",
    ReviewGetAll => "Review_GetAll",
    ReviewGetById => "Review_GetById",
    ReviewUpdate => "Review_Update",
    ReviewDelete => "Review_Delete",

    PaymentCreate => "Payment_Create",
    PaymentGetAll => "Payment_GetAll",
    PaymentGetById => "Payment_GetById",
    PaymentUpdate => "Payment_Update",
    PaymentDelete => "Payment_Delete",

    UserRoleCreate => "UserRole_Create",
    UserRoleGetAll => "UserRole_GetAll",
    UserRoleGetById => "UserRole_GetById",
    UserRoleUpdate => "UserRole_Update",
    UserRoleDelete => "UserRole_Delete",

    ShippingAddressCreate => "ShippingAddress_Create",
    ShippingAddressGetAll => "ShippingAddress_GetAll",
    ShippingAddressGetById => "ShippingAddress_GetById",
    ShippingAddressUpdate => "ShippingAddress_Update",
    ShippingAddressDelete => "ShippingAddress_Delete",

    RolePermissionCreate => "RolePermission_Create",
    RolePermissionGetAll => "RolePermission_GetAll",
    RolePermissionGetById => "RolePermission_GetById",
    RolePermissionUpdate => "RolePermission_Update",
    RolePermissionDelete => "RolePermission_Delete",

    OrderItemCreate => "OrderItem_Create",
    OrderItemGetAll => "OrderItem_GetAll",
    OrderItemGetById => "OrderItem_GetById",
    OrderItemUpdate => "OrderItem_Update",
    OrderItemDelete => "OrderItem_Delete",
}

impl Permission {
    /// Position in [`Permission::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown permission: {0}")]
pub struct UnknownPermission(pub String);

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn names_are_unique_and_parse_back() {
        let names: HashSet<&str> = Permission::ALL.iter().map(|p| p.as_str()).collect();
        assert_eq!(names.len(), Permission::ALL.len());

        for permission in Permission::ALL {
            assert_eq!(permission.as_str().parse::<Permission>(), Ok(*permission));
        }
    }

    #[test]
    fn index_matches_position_in_all() {
        for (position, permission) in Permission::ALL.iter().enumerate() {
            assert_eq!(permission.index(), position);
        }
    }

    #[test]
    fn unknown_names_are_rejected() {
        let err = "Product_Archive".parse::<Permission>().unwrap_err();
        assert_eq!(err, UnknownPermission("Product_Archive".to_string()));
        assert!("product_create".parse::<Permission>().is_err());
    }

    #[test]
    fn serde_uses_wire_names() {
        let json = serde_json::to_string(&Permission::OrderDelete).unwrap();
        assert_eq!(json, "\"Order_Delete\"");
        let parsed: Permission = serde_json::from_str("\"WishList_GetById\"").unwrap();
        assert_eq!(parsed, Permission::WishListGetById);
    }

    #[test]
    fn catalog_has_admin_plus_five_operations_per_entity() {
        assert_eq!(Permission::ALL.len(), 1 + 16 * 5);
        assert_eq!(Permission::ALL[0], Permission::AdminPermission);
    }
}
