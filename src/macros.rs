//! Declaration macro for persistent objects.

/// Declares an entity struct and its [`Entity`](crate::object::Entity) impl.
///
/// Each field maps a struct member to a column and a
/// [`FieldSpec`](crate::schema::FieldSpec). Column names are also exposed as
/// associated constants (`str_screen` becomes `Screen::STR_SCREEN`).
///
/// ```ignore
/// persistent_object! {
///     pub struct Screen {
///         table: "screen",
///         key: "intScreenID",
///         timestamp: "lastChange",
///         fields {
///             str_screen: String = "strScreen" => FieldSpec::varchar(255).unique(),
///         }
///     }
/// }
/// ```
///
/// `timestamp`, `owner`, `policy` and `demo` are optional but must keep this
/// order. `key` also accepts an array of declared columns for composite keys.
#[macro_export]
macro_rules! persistent_object {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            table: $table:literal,
            key: $key:expr,
            $( timestamp: $timestamp:literal, )?
            $( owner: $owner:literal, )?
            $( policy: $policy:expr, )?
            $( demo: $demo:expr, )?
            fields {
                $( $(#[$field_meta:meta])* $field:ident : $field_ty:ty = $column:literal => $spec:expr ),+ $(,)?
            }
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq)]
        $vis struct $name {
            $( $(#[$field_meta])* pub $field: $field_ty, )+
        }

        $crate::paste::paste! {
            impl $name {
                $( pub const [<$field:upper>]: &'static str = $column; )+
            }
        }

        impl $crate::object::Entity for $name {
            fn descriptor() -> &'static $crate::schema::EntityDescriptor {
                static DESCRIPTOR: ::std::sync::OnceLock<$crate::schema::EntityDescriptor> =
                    ::std::sync::OnceLock::new();
                DESCRIPTOR.get_or_init(|| {
                    let descriptor = $crate::schema::EntityDescriptor::new(stringify!($name), $table, $key)
                        $( .field($column, $spec) )+;
                    $( let descriptor = descriptor.timestamp($timestamp); )?
                    $( let descriptor = descriptor.owner($owner); )?
                    $( let descriptor = descriptor.policy($policy); )?
                    descriptor
                })
            }

            fn field_value(&self, field: &str) -> Option<$crate::core::Value> {
                match field {
                    $( $column => Some($crate::object::FieldValue::to_value(&self.$field)), )+
                    _ => None,
                }
            }

            fn assign_field(
                &mut self,
                field: &str,
                value: $crate::core::Value,
            ) -> ::std::result::Result<(), $crate::object::AssignError> {
                match field {
                    $(
                        $column => {
                            self.$field = <$field_ty as $crate::object::FieldValue>::from_value(value)
                                .map_err($crate::object::AssignError::Invalid)?;
                            Ok(())
                        }
                    )+
                    _ => Err($crate::object::AssignError::Unknown),
                }
            }

            $(
                fn demo_data() -> &'static str {
                    $demo
                }
            )?
        }
    };
}
