//! 学习路径数据：按天分组的 PHP 主题，每个主题附带可加载的示例脚本。

#[derive(Debug, Clone, Copy)]
pub struct Topic {
    pub name: &'static str,
    pub description: &'static str,
    pub code: &'static str,
}

#[derive(Debug, Clone, Copy)]
pub struct DayPlan {
    pub day: u8,
    pub title: &'static str,
    pub topics: &'static [Topic],
}

impl Topic {
    /// 载入示例时使用的文件名，例如 `learn/03-variables.php`。
    pub fn scratch_path(&self, day: u8, index: usize) -> String {
        let slug: String = self
            .name
            .chars()
            .skip_while(|c| c.is_ascii_digit() || *c == '.' || *c == ' ')
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_lowercase()
                } else {
                    '-'
                }
            })
            .collect();
        let slug = slug.trim_matches('-').replace("--", "-");
        format!("learn/day{day:02}-{index}-{slug}.php")
    }
}

pub const LEARNING_PATH: &[DayPlan] = &[
    DayPlan {
        day: 1,
        title: "The Absolute Basics",
        topics: &[
            Topic {
                name: "1. Hello World",
                description: "The classic first program using `echo`.",
                code: "<?php\n\necho \"Hello, Modern PHP World!\";\n\n?>",
            },
            Topic {
                name: "2. Variables",
                description: "Storing data in variables.",
                code: "<?php\n\n$name = \"Alice\";\n$age = 30;\n\necho \"Name: $name, Age: $age\";\n\n?>",
            },
            Topic {
                name: "3. Constants",
                description: "Defining values that do not change.",
                code: "<?php\n\nconst SITE_NAME = \"PHP Learning Editor\";\necho \"Welcome to \" . SITE_NAME;\n\n?>",
            },
        ],
    },
    DayPlan {
        day: 2,
        title: "Core Data Types",
        topics: &[
            Topic {
                name: "4. Data Types",
                description: "A look at PHP's main scalar and compound data types.",
                code: "<?php\n\n$string = \"text\";\n$integer = 100;\n$float = 19.99;\n$bool = true;\n$array = [1, 'two'];\n$null = null;\n\nvar_dump($string, $integer, $float, $bool, $array, $null);\n\n?>",
            },
            Topic {
                name: "5. Comparison Operators",
                description: "Comparing values (including strict vs. loose).",
                code: "<?php\n\nvar_dump(5 == \"5\");  // bool(true) - loose comparison\nvar_dump(5 === \"5\"); // bool(false) - strict comparison\nvar_dump(10 > 5);\nvar_dump(7 <=> 8); // Spaceship operator: -1\n\n?>",
            },
        ],
    },
    DayPlan {
        day: 3,
        title: "Conditional Logic",
        topics: &[
            Topic {
                name: "6. If-Elseif-Else",
                description: "Executing code based on different conditions.",
                code: "<?php\n\n$hour = date('H');\n\nif ($hour < 12) {\n    echo \"Good morning!\";\n} elseif ($hour < 18) {\n    echo \"Good afternoon!\";\n} else {\n    echo \"Good evening!\";\n}\n\n?>",
            },
            Topic {
                name: "7. Null Coalescing Operator (??)",
                description: "Provide a default value for null variables.",
                code: "<?php\n\n$username = $_GET['user'] ?? 'guest';\necho \"Welcome, \" . htmlspecialchars($username);\n\n?>",
            },
            Topic {
                name: "8. `match` Expression (PHP 8.0+)",
                description: "A modern, type-safe, and expression-based alternative to `switch`.",
                code: "<?php\n\n$http_status = 200;\n\n$message = match ($http_status) {\n    200, 304 => 'Success',\n    404 => 'Not Found',\n    500 => 'Server Error',\n    default => 'Unknown status',\n};\n\necho $message;\n\n?>",
            },
        ],
    },
    DayPlan {
        day: 4,
        title: "Loops and Arrays",
        topics: &[
            Topic {
                name: "9. `foreach` with Key and Value",
                description: "Accessing both the key and value in an associative array.",
                code: "<?php\n\n$user = [\n    'name' => 'John Doe',\n    'email' => 'john.doe@example.com',\n    'role' => 'Admin'\n];\n\nforeach ($user as $key => $value) {\n    echo ucfirst($key) . \": $value <br>\";\n}\n\n?>",
            },
            Topic {
                name: "10. `array_map`",
                description: "Apply a callback to the elements of an array.",
                code: "<?php\n\n$numbers = [1, 2, 3, 4, 5];\n$squares = array_map(fn($n) => $n * $n, $numbers);\n\nprint_r($squares);\n\n?>",
            },
            Topic {
                name: "11. `array_filter`",
                description: "Filter elements of an array using a callback function.",
                code: "<?php\n\n$numbers = [1, 2, 3, 4, 5, 6];\n$evens = array_filter($numbers, fn($n) => $n % 2 === 0);\n\nprint_r($evens);\n\n?>",
            },
        ],
    },
    DayPlan {
        day: 5,
        title: "Functions",
        topics: &[
            Topic {
                name: "12. Typed Parameters & Return Types",
                description: "Enforcing data types for function inputs and outputs.",
                code: "<?php\n\ndeclare(strict_types=1);\n\nfunction calculate_total(float $price, int $quantity): float {\n    return $price * $quantity;\n}\n\n$total = calculate_total(9.99, 3);\necho \"Total cost: $$total\";\n\n?>",
            },
            Topic {
                name: "13. Arrow Functions (PHP 7.4+)",
                description: "A concise syntax for simple anonymous functions.",
                code: "<?php\n\n$numbers = [1, 2, 3, 4];\n$doubled = array_map(fn($n) => $n * 2, $numbers);\n\nprint_r($doubled);\n\n?>",
            },
            Topic {
                name: "14. Named Arguments (PHP 8.0+)",
                description: "Passing arguments by name, making code more readable.",
                code: "<?php\n\nfunction set_cookie(string $name, string $value, int $expire = 0) {\n    echo \"Setting cookie '$name' which expires in $expire seconds.\";\n}\n\nset_cookie(name: 'user_id', value: '123');\n\n?>",
            },
        ],
    },
    DayPlan {
        day: 6,
        title: "Modern OOP",
        topics: &[
            Topic {
                name: "15. Constructor Property Promotion (PHP 8.0+)",
                description: "A concise way to declare and initialize properties.",
                code: "<?php\n\nclass Product {\n    public function __construct(\n        public string $name,\n        public float $price,\n        public int $stock = 0\n    ) {}\n}\n\n$product = new Product(name: 'Laptop', price: 1200.00);\necho \"Product: {$product->name}, Price: \\${$product->price}\";\n\n?>",
            },
            Topic {
                name: "16. `readonly` Properties (PHP 8.1+)",
                description: "Create properties that cannot be changed after initialization.",
                code: "<?php\n\nclass Transaction {\n    public function __construct(\n        public readonly string $transactionId,\n        public float $amount\n    ) {}\n}\n\n$tx = new Transaction(transactionId: 'txn_123', amount: 99.99);\necho \"Transaction ID: {$tx->transactionId}\";\n\n?>",
            },
            Topic {
                name: "17. Backed Enums (PHP 8.1+)",
                description: "Enums where each case is backed by a string or int value.",
                code: "<?php\n\nenum UserRole: string {\n    case GUEST = 'guest';\n    case EDITOR = 'editor';\n    case ADMIN = 'admin';\n}\n\n$role = UserRole::ADMIN;\necho \"Role value: \" . $role->value;\n\n?>",
            },
        ],
    },
    DayPlan {
        day: 7,
        title: "Errors and Databases",
        topics: &[
            Topic {
                name: "18. `try...catch...finally`",
                description: "Using a `finally` block for cleanup code.",
                code: "<?php\n\ntry {\n    echo \"Trying to do something.<br>\";\n    throw new Exception(\"Something failed.\");\n} catch (Exception $e) {\n    echo \"Caught exception: \" . $e->getMessage() . \"<br>\";\n} finally {\n    echo \"This finally block always runs.\";\n}\n\n?>",
            },
            Topic {
                name: "19. PDO: Prepared Statements",
                description: "Securely inserting data to prevent SQL injection.",
                code: "<?php\n\n$pdo = new PDO('sqlite::memory:');\n$pdo->exec(\"CREATE TABLE products (name TEXT, price REAL)\");\n\n$stmt = $pdo->prepare(\"INSERT INTO products (name, price) VALUES (?, ?)\");\n\n$products = [\n    ['Laptop', 1299.99],\n    ['Mouse', 25.50]\n];\n\nforeach ($products as $product) {\n    $stmt->execute($product);\n}\n\necho \"2 products inserted.\";\n\n?>",
            },
            Topic {
                name: "20. Password Hashing & Verification",
                description: "The modern, secure way to handle user passwords.",
                code: "<?php\n\n$password = 'password123';\n\n$hash = password_hash($password, PASSWORD_ARGON2ID);\necho \"Hashed password: \" . $hash . \"<br>\";\n\nif (password_verify('password123', $hash)) {\n    echo \"Password is correct!\";\n}\n\n?>",
            },
        ],
    },
];

/// 平铺索引 -> (天, 主题)，侧边栏按行选取时用。
pub fn topic_at(flat_index: usize) -> Option<(&'static DayPlan, usize, &'static Topic)> {
    let mut remaining = flat_index;
    for plan in LEARNING_PATH {
        if remaining < plan.topics.len() {
            return Some((plan, remaining, &plan.topics[remaining]));
        }
        remaining -= plan.topics.len();
    }
    None
}

pub fn topic_count() -> usize {
    LEARNING_PATH.iter().map(|p| p.topics.len()).sum()
}
